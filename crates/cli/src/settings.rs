//! Optional `config.json` beside the session files.
//!
//! Loaded tolerantly: a missing or corrupt file means defaults. Command-line
//! flags override anything set here.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chatgpt::api::ApiConfig;
use chatgpt::login::{LoginConfig, LoginOptions};
use chatgpt::CookiePolicy;
use chatgpt_runtime::AcquireOptions;
use serde::Deserialize;
use tracing::warn;

use crate::cli::LoginArgs;

pub const SETTINGS_FILE: &str = "config.json";
pub const BROWSER_PROFILE_DIR: &str = "browser-profile";
const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
	#[serde(default)]
	pub model: Option<String>,
	#[serde(default)]
	pub base_url: Option<String>,
	#[serde(default)]
	pub login_timeout_secs: Option<u64>,
	#[serde(default)]
	pub debug_port: Option<u16>,
	#[serde(default)]
	pub keep_browser: Option<bool>,
}

impl Settings {
	pub fn path(config_dir: &Path) -> PathBuf {
		config_dir.join(SETTINGS_FILE)
	}

	pub fn load(config_dir: &Path) -> Self {
		let path = Self::path(config_dir);
		let Ok(content) = fs::read_to_string(&path) else {
			return Self::default();
		};
		serde_json::from_str(&content).unwrap_or_else(|err| {
			warn!(path = %path.display(), error = %err, "ignoring unreadable settings");
			Self::default()
		})
	}

	pub fn api_config(&self, model: Option<String>) -> ApiConfig {
		let mut config = ApiConfig::default();
		if let Some(model) = model.or_else(|| self.model.clone()) {
			config.model = model;
		}
		if let Some(base_url) = &self.base_url {
			config.base_url = base_url.clone();
		}
		config
	}

	pub fn login_options(&self, args: &LoginArgs, config_dir: &Path, policy: CookiePolicy) -> LoginOptions {
		let timeout = args.timeout.or(self.login_timeout_secs).unwrap_or(DEFAULT_LOGIN_TIMEOUT_SECS);
		LoginOptions {
			browser: AcquireOptions {
				port: args.port.or(self.debug_port),
				user_data_dir: config_dir.join(BROWSER_PROFILE_DIR),
			},
			keep_browser: args.keep_browser || self.keep_browser.unwrap_or(false),
			config: LoginConfig {
				timeout: Duration::from_secs(timeout),
				..LoginConfig::default()
			},
			policy,
		}
	}
}
