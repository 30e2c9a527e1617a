//! Owned-versus-borrowed browser handles.
//!
//! A login run either attaches to a browser the user already started with a
//! debugging port (borrowed: never terminated by us) or launches its own
//! (owned: terminated on every exit path unless the caller asks to keep it).

use std::path::PathBuf;
use std::process::Child;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::discovery::find_debugging_ports;
use crate::endpoint::{CdpVersionInfo, fetch_cdp_endpoint};
use crate::error::{Result, RuntimeError};
use crate::launcher::launch_chrome;
use crate::process::{free_port, port_available, request_group_exit};

const EXIT_GRACE_POLLS: u32 = 20;
const EXIT_GRACE_INTERVAL: Duration = Duration::from_millis(100);

/// How to find or start the login browser.
#[derive(Debug, Clone)]
pub struct AcquireOptions {
	/// Fixed debugging port; `None` scans running browsers, then picks a free port.
	pub port: Option<u16>,
	/// Profile directory for a launched browser.
	pub user_data_dir: PathBuf,
}

/// A browser this run is connected to.
#[derive(Debug)]
pub enum BrowserHandle {
	/// Launched by this run.
	Owned { child: Child, port: u16, endpoint: CdpVersionInfo },
	/// Already running; must be left alone on exit.
	Borrowed { port: u16, endpoint: CdpVersionInfo },
}

/// What [`BrowserHandle::release`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
	/// Borrowed browser, untouched.
	LeftRunning { port: u16 },
	/// Owned browser the caller asked to keep.
	KeptRunning { pid: u32, port: u16 },
	/// Owned browser shut down.
	Terminated { pid: u32 },
	/// Owned browser had already exited.
	AlreadyExited { pid: u32 },
}

impl BrowserHandle {
	/// Attaches to a running debug browser if one answers, otherwise launches one.
	pub async fn locate_or_launch(options: &AcquireOptions) -> Result<Self> {
		if let Some(port) = options.port {
			if let Ok(endpoint) = fetch_cdp_endpoint(port).await {
				info!(port, browser = %endpoint.describe(), "attaching to running browser");
				return Ok(Self::Borrowed { port, endpoint });
			}
			if !port_available(port) {
				return Err(RuntimeError::Launch(format!(
					"Port {port} is in use but does not expose a DevTools endpoint. Pick another --port."
				)));
			}
			return Self::launch(port, options).await;
		}

		for port in find_debugging_ports() {
			match fetch_cdp_endpoint(port).await {
				Ok(endpoint) => {
					info!(port, browser = %endpoint.describe(), "found existing browser with remote debugging");
					return Ok(Self::Borrowed { port, endpoint });
				}
				Err(e) => debug!(port, error = %e, "debug port advertised but not reachable"),
			}
		}

		let port = free_port()?;
		Self::launch(port, options).await
	}

	async fn launch(port: u16, options: &AcquireOptions) -> Result<Self> {
		let (child, endpoint) = launch_chrome(port, &options.user_data_dir).await?;
		info!(port, pid = child.id(), browser = %endpoint.describe(), "launched browser");
		Ok(Self::Owned { child, port, endpoint })
	}

	pub fn port(&self) -> u16 {
		match self {
			Self::Owned { port, .. } | Self::Borrowed { port, .. } => *port,
		}
	}

	/// Browser-level WebSocket URL.
	pub fn ws_url(&self) -> &str {
		match self {
			Self::Owned { endpoint, .. } | Self::Borrowed { endpoint, .. } => &endpoint.web_socket_debugger_url,
		}
	}

	pub fn is_owned(&self) -> bool {
		matches!(self, Self::Owned { .. })
	}

	/// Ends this run's claim on the browser.
	pub async fn release(self, keep_running: bool) -> ReleaseOutcome {
		match self {
			Self::Borrowed { port, .. } => ReleaseOutcome::LeftRunning { port },
			Self::Owned { child, port, .. } if keep_running => ReleaseOutcome::KeptRunning { pid: child.id(), port },
			Self::Owned { child, .. } => terminate(child).await,
		}
	}
}

async fn terminate(mut child: Child) -> ReleaseOutcome {
	let pid = child.id();
	if let Ok(Some(_)) = child.try_wait() {
		return ReleaseOutcome::AlreadyExited { pid };
	}

	if request_group_exit(&child) {
		for _ in 0..EXIT_GRACE_POLLS {
			if let Ok(Some(_)) = child.try_wait() {
				return ReleaseOutcome::Terminated { pid };
			}
			tokio::time::sleep(EXIT_GRACE_INTERVAL).await;
		}
	}

	if let Err(e) = child.kill() {
		warn!(pid, error = %e, "failed to kill browser");
	}
	let _ = child.wait();
	ReleaseOutcome::Terminated { pid }
}

#[cfg(test)]
mod tests {
	use super::*;

	fn endpoint() -> CdpVersionInfo {
		CdpVersionInfo {
			web_socket_debugger_url: "ws://127.0.0.1:9222/devtools/browser/abc".into(),
			browser: None,
			user_agent: None,
		}
	}

	#[tokio::test]
	async fn borrowed_browser_is_left_running() {
		let handle = BrowserHandle::Borrowed { port: 9222, endpoint: endpoint() };
		assert!(!handle.is_owned());
		assert_eq!(handle.ws_url(), "ws://127.0.0.1:9222/devtools/browser/abc");
		assert_eq!(handle.release(false).await, ReleaseOutcome::LeftRunning { port: 9222 });
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn owned_browser_is_terminated() {
		let mut cmd = std::process::Command::new("sleep");
		cmd.arg("30");
		crate::process::detach_process_group(&mut cmd);
		let child = cmd.spawn().unwrap();
		let pid = child.id();
		let handle = BrowserHandle::Owned { child, port: 1, endpoint: endpoint() };
		assert_eq!(handle.release(false).await, ReleaseOutcome::Terminated { pid });
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn owned_browser_can_be_kept() {
		let child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
		let pid = child.id();
		let handle = BrowserHandle::Owned { child, port: 2, endpoint: endpoint() };
		assert_eq!(handle.release(true).await, ReleaseOutcome::KeptRunning { pid, port: 2 });
		let _ = std::process::Command::new("kill").arg(pid.to_string()).status();
	}
}
