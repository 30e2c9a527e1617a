//! Browser process launch for login flows.

use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tracing::debug;

use crate::discovery::find_chrome_executable;
use crate::endpoint::{CdpVersionInfo, fetch_cdp_endpoint};
use crate::error::{Result, RuntimeError};
use crate::process::detach_process_group;

const ENDPOINT_POLL_ATTEMPTS: u32 = 50;
const ENDPOINT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Command-line flags for a login browser on `port`.
pub fn launch_args(port: u16, user_data_dir: &Path) -> Vec<String> {
	vec![
		format!("--remote-debugging-port={port}"),
		format!("--user-data-dir={}", user_data_dir.display()),
		"--no-first-run".to_string(),
		"--no-default-browser-check".to_string(),
		"--disable-extensions".to_string(),
		"about:blank".to_string(),
	]
}

/// Launches a headed browser with remote debugging and waits for its endpoint.
pub async fn launch_chrome(port: u16, user_data_dir: &Path) -> Result<(Child, CdpVersionInfo)> {
	let chrome_path = find_chrome_executable().ok_or(RuntimeError::BrowserNotFound)?;
	std::fs::create_dir_all(user_data_dir)?;

	let mut cmd = Command::new(&chrome_path);
	cmd.args(launch_args(port, user_data_dir))
		.stdin(Stdio::null())
		.stdout(Stdio::null())
		.stderr(Stdio::null());
	detach_process_group(&mut cmd);

	debug!(path = %chrome_path, port, "launching browser");
	let mut child = cmd.spawn().map_err(|source| RuntimeError::Spawn {
		path: chrome_path.clone(),
		source,
	})?;

	let mut last_error = "endpoint not reachable".to_string();
	for _ in 0..ENDPOINT_POLL_ATTEMPTS {
		tokio::time::sleep(ENDPOINT_POLL_INTERVAL).await;

		if let Ok(Some(status)) = child.try_wait() {
			return Err(RuntimeError::Launch(format!(
				"Browser exited before its debugging endpoint became available (status: {status}). \
				 If another instance is using the same profile, close it or start it with --remote-debugging-port={port}."
			)));
		}

		match fetch_cdp_endpoint(port).await {
			Ok(info) => return Ok((child, info)),
			Err(e) => last_error = e.to_string(),
		}
	}

	let _ = child.kill();
	let _ = child.wait();
	Err(RuntimeError::Launch(format!(
		"Browser launched but debugging endpoint not available on port {port}.\nLast error: {last_error}"
	)))
}
