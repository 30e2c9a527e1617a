//! CDP endpoint probing over the browser's HTTP debugging interface.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, RuntimeError};

/// `/json/version` response subset from Chrome DevTools Protocol.
#[derive(Debug, Clone, Deserialize)]
pub struct CdpVersionInfo {
	#[serde(rename = "webSocketDebuggerUrl")]
	pub web_socket_debugger_url: String,
	#[serde(rename = "Browser")]
	pub browser: Option<String>,
	#[serde(rename = "User-Agent")]
	pub user_agent: Option<String>,
}

impl CdpVersionInfo {
	/// Product and user agent for log lines, e.g. `Chrome/135.0 (Mozilla/5.0 ...)`.
	pub fn describe(&self) -> String {
		match (&self.browser, &self.user_agent) {
			(Some(browser), Some(ua)) => format!("{browser} ({ua})"),
			(Some(browser), None) => browser.clone(),
			(None, Some(ua)) => ua.clone(),
			(None, None) => "unknown browser".to_string(),
		}
	}
}

/// Resolves CDP version metadata from `/json/version` on `port`.
pub async fn fetch_cdp_endpoint(port: u16) -> Result<CdpVersionInfo> {
	let client = reqwest::Client::builder()
		.timeout(Duration::from_millis(400))
		.build()
		.map_err(|e| RuntimeError::Endpoint {
			port,
			reason: format!("failed to create HTTP client: {e}"),
		})?;
	let mut last_error = "no response".to_string();

	for url in [
		format!("http://127.0.0.1:{port}/json/version"),
		format!("http://localhost:{port}/json/version"),
		format!("http://[::1]:{port}/json/version"),
	] {
		let response = match client.get(&url).send().await {
			Ok(r) => r,
			Err(e) => {
				last_error = e.to_string();
				continue;
			}
		};

		if !response.status().is_success() {
			last_error = format!("unexpected status {}", response.status());
			continue;
		}

		return response.json::<CdpVersionInfo>().await.map_err(|e| RuntimeError::Endpoint {
			port,
			reason: format!("failed to parse /json/version: {e}"),
		});
	}

	Err(RuntimeError::Endpoint { port, reason: last_error })
}
