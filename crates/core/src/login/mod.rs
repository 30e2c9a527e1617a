//! Browser-driven login: wait for the user to sign in, then capture the
//! cookie jar, user agent, access token and backend request headers.
//!
//! The flow only talks to the page through [`BrowserProbe`], so it runs the
//! same against [`CdpProbe`] and scripted fixtures. [`login`] wraps it with
//! browser acquisition and guaranteed release.

mod cdp;
mod detect;
mod probe;

use std::time::Duration;

use chatgpt_protocol::{Cookie, SessionData};
use chatgpt_runtime::{AcquireOptions, BrowserHandle, CdpConnection, ReleaseOutcome};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub use cdp::CdpProbe;
pub use detect::{PageSnapshot, UrlRules, is_logged_in};
pub use probe::BrowserProbe;

use crate::config::CookiePolicy;
use crate::cookie_filter::filter_for_transport;
use crate::error::Result;
use crate::store::SessionStore;
use crate::validator::CredentialStatus;

pub const LOGIN_URL: &str = "https://chatgpt.com/auth/login";
pub const CHAT_URL: &str = "https://chatgpt.com/";

#[derive(Debug, Error)]
pub enum LoginError {
	#[error("Login timed out after {} seconds. Please try again.", waited.as_secs())]
	Timeout { waited: Duration },

	#[error("Missing critical cookies: {}", missing.join(", "))]
	MissingCriticalCookies { missing: Vec<String> },

	#[error("Failed to capture cookies. Please try again.")]
	NoCookies,

	#[error("Browser error: {0}")]
	Browser(String),
}

/// Timing, URLs and page expressions for one login attempt.
#[derive(Debug, Clone)]
pub struct LoginConfig {
	pub login_url: String,
	pub chat_url: String,
	/// URLs for the scoped cookie read used when the full jar comes back empty.
	pub cookie_urls: Vec<String>,
	pub rules: UrlRules,
	/// Path fragment of backend requests whose headers are recorded.
	pub api_path_marker: String,
	pub poll_interval: Duration,
	pub timeout: Duration,
	/// Cookie jar reads after login before giving up on the session token.
	pub cookie_retries: u32,
	/// Pause after a post-login navigation so late cookies can land.
	pub settle_delay: Duration,
	pub chat_ui_expression: String,
	pub user_menu_expression: String,
	pub user_agent_expression: String,
	/// Tried in order; the first non-empty string wins.
	pub access_token_expressions: Vec<String>,
}

impl Default for LoginConfig {
	fn default() -> Self {
		Self {
			login_url: LOGIN_URL.into(),
			chat_url: CHAT_URL.into(),
			cookie_urls: vec!["https://chatgpt.com/".into(), "https://chat.openai.com/".into()],
			rules: UrlRules::default(),
			api_path_marker: "/backend-api".into(),
			poll_interval: Duration::from_secs(2),
			timeout: Duration::from_secs(5 * 60),
			cookie_retries: 5,
			settle_delay: Duration::from_secs(2),
			chat_ui_expression: "(document.querySelector('main h1.text-4xl') !== null) \
				|| (document.querySelector('.flex-col.flex-1') !== null) \
				|| (document.querySelector('[data-testid=\"send-button\"]') !== null)"
				.into(),
			user_menu_expression: "document.querySelector('[data-testid=\"user-menu-button\"]') !== null".into(),
			user_agent_expression: "navigator.userAgent".into(),
			access_token_expressions: vec![
				"JSON.parse(localStorage.getItem('oai-auth') || '{}').accessToken || null".into(),
				"(() => { const el = document.getElementById('__NEXT_DATA__'); \
				 if (!el) return null; \
				 const data = JSON.parse(el.textContent || '{}'); \
				 return (data.props && data.props.pageProps && data.props.pageProps.accessToken) || null; })()"
					.into(),
			],
		}
	}
}

/// What a successful login captured and saved.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginSummary {
	/// Cookies in the browser jar.
	pub cookies_captured: usize,
	/// Names of the cookies written to the session file, in order.
	pub saved_cookie_names: Vec<String>,
	/// Expected cookie names absent from the jar.
	pub missing_expected: Vec<String>,
	pub has_access_token: bool,
	pub has_clearance: bool,
	pub has_bot_management: bool,
	pub headers_captured: usize,
	/// Set by [`login`]; `None` when the flow ran against a caller-supplied probe.
	pub browser: Option<ReleaseOutcome>,
}

/// One login attempt against a page.
pub struct LoginFlow<'a> {
	config: &'a LoginConfig,
	policy: &'a CookiePolicy,
}

impl<'a> LoginFlow<'a> {
	pub fn new(config: &'a LoginConfig, policy: &'a CookiePolicy) -> Self {
		Self { config, policy }
	}

	/// Opens the login page, waits for login, captures and persists the session.
	///
	/// Nothing is written unless the captured cookies carry a usable credential.
	pub async fn run<P: BrowserProbe + ?Sized>(&self, probe: &P, store: &SessionStore) -> Result<LoginSummary> {
		probe
			.navigate(&self.config.login_url)
			.await
			.map_err(|e| LoginError::Browser(format!("could not open {}: {e}", self.config.login_url)))?;

		self.wait_for_login(probe).await?;
		info!(target = "chatgpt", "login detected, capturing session");

		self.ensure_chat_page(probe).await;
		let cookies = self.read_cookie_jar(probe).await;
		if cookies.is_empty() {
			return Err(LoginError::NoCookies.into());
		}
		debug!(count = cookies.len(), "cookies captured");

		let user_agent = probe
			.evaluate_string(&self.config.user_agent_expression)
			.await
			.ok()
			.flatten()
			.unwrap_or_default();
		let access_token = self.access_token(probe).await;
		if access_token.is_none() {
			warn!(target = "chatgpt", "could not retrieve access token, some features might not work");
		}

		let status = CredentialStatus::presence(&cookies, self.policy);
		let missing = status.missing_critical(self.policy);
		if !missing.is_empty() {
			return Err(LoginError::MissingCriticalCookies { missing }.into());
		}

		let missing_expected: Vec<String> = self
			.policy
			.expected_names
			.iter()
			.filter(|name| !cookies.iter().any(|c| &c.name == *name))
			.cloned()
			.collect();
		if !missing_expected.is_empty() {
			warn!(target = "chatgpt", missing = %missing_expected.join(", "), "some expected cookies are missing");
		}

		let filtered = filter_for_transport(&cookies, self.policy);
		debug!(kept = filtered.len(), from = cookies.len(), "cookies filtered");
		let has_clearance = filtered.iter().any(|c| c.name == self.policy.clearance);
		let has_bot_management = filtered.iter().any(|c| c.name == "__cf_bm");

		let session = SessionData {
			cookies: filtered,
			user_agent,
			access_token,
		};
		let headers = probe.captured_headers();
		store.save_session(&session)?;
		store.save_headers(&headers)?;
		info!(target = "chatgpt", cookies = session.cookies.len(), headers = headers.len(), "session saved");

		Ok(LoginSummary {
			cookies_captured: cookies.len(),
			saved_cookie_names: session.cookies.iter().map(|c| c.name.clone()).collect(),
			missing_expected,
			has_access_token: session.access_token.is_some(),
			has_clearance,
			has_bot_management,
			headers_captured: headers.len(),
			browser: None,
		})
	}

	/// Polls the page until [`is_logged_in`] holds or the timeout passes.
	pub async fn wait_for_login<P: BrowserProbe + ?Sized>(&self, probe: &P) -> std::result::Result<(), LoginError> {
		let started = Instant::now();
		loop {
			tokio::time::sleep(self.config.poll_interval).await;
			if let Some(snapshot) = self.snapshot(probe).await {
				debug!(
					url = %snapshot.url,
					chat_ui = snapshot.chat_ui,
					user_menu = snapshot.user_menu,
					session_token = snapshot.cookies.session_token.is_present(),
					puid = snapshot.cookies.puid.is_present(),
					clearance = snapshot.cookies.clearance.is_present(),
					"login poll"
				);
				if is_logged_in(&snapshot, &self.config.rules) {
					return Ok(());
				}
			}
			if started.elapsed() >= self.config.timeout {
				return Err(LoginError::Timeout {
					waited: self.config.timeout,
				});
			}
		}
	}

	/// Observes the page once. `None` when the URL cannot be read.
	pub async fn snapshot<P: BrowserProbe + ?Sized>(&self, probe: &P) -> Option<PageSnapshot> {
		let url = match probe.current_url().await {
			Ok(url) => url,
			Err(err) => {
				debug!(error = %err, "could not read page URL");
				return None;
			}
		};
		let chat_ui = probe.evaluate_bool(&self.config.chat_ui_expression).await.unwrap_or(false);
		let user_menu = probe.evaluate_bool(&self.config.user_menu_expression).await.unwrap_or(false);
		let cookies = match probe.all_cookies().await {
			Ok(cookies) => cookies,
			Err(err) => {
				debug!(error = %err, "could not read cookies");
				Vec::new()
			}
		};
		Some(PageSnapshot {
			url,
			chat_ui,
			user_menu,
			cookies: CredentialStatus::presence(&cookies, self.policy),
		})
	}

	async fn ensure_chat_page<P: BrowserProbe + ?Sized>(&self, probe: &P) {
		let on_chat_host = probe.current_url().await.is_ok_and(|url| self.config.rules.is_chat_host(&url));
		if on_chat_host {
			return;
		}
		if let Err(err) = probe.navigate(&self.config.chat_url).await {
			debug!(error = %err, "could not navigate to chat page");
			return;
		}
		tokio::time::sleep(self.config.settle_delay).await;
	}

	/// Reads the jar until a session token shows up or retries run out,
	/// re-navigating between attempts. Returns the last jar read.
	async fn read_cookie_jar<P: BrowserProbe + ?Sized>(&self, probe: &P) -> Vec<Cookie> {
		let mut jar = Vec::new();
		for attempt in 1..=self.config.cookie_retries {
			let mut read = probe.all_cookies().await.unwrap_or_else(|err| {
				debug!(attempt, error = %err, "full cookie read failed");
				Vec::new()
			});
			if read.is_empty() {
				read = probe.cookies_for(&self.config.cookie_urls).await.unwrap_or_default();
			}
			if !read.is_empty() {
				jar = read;
				if jar.iter().any(|c| self.policy.is_session_token(&c.name)) {
					debug!(attempt, "session token present");
					break;
				}
				debug!(attempt, "cookies read without session token");
			}
			if attempt < self.config.cookie_retries {
				if let Err(err) = probe.navigate(&self.config.chat_url).await {
					debug!(error = %err, "re-navigation failed");
				}
				tokio::time::sleep(self.config.settle_delay).await;
			}
		}
		jar
	}

	async fn access_token<P: BrowserProbe + ?Sized>(&self, probe: &P) -> Option<String> {
		for expression in &self.config.access_token_expressions {
			match probe.evaluate_string(expression).await {
				Ok(Some(token)) => return Some(token),
				Ok(None) => {}
				Err(err) => debug!(error = %err, "access token lookup failed"),
			}
		}
		None
	}
}

/// Options for a full login run including the browser.
#[derive(Debug, Clone)]
pub struct LoginOptions {
	pub browser: AcquireOptions,
	/// Leave a browser this run launched open afterwards.
	pub keep_browser: bool,
	pub config: LoginConfig,
	pub policy: CookiePolicy,
}

/// Acquires a browser, runs [`LoginFlow`], and releases the browser on every path.
pub async fn login(options: &LoginOptions, store: &SessionStore) -> Result<LoginSummary> {
	let handle = BrowserHandle::locate_or_launch(&options.browser).await?;
	info!(target = "chatgpt", port = handle.port(), owned = handle.is_owned(), "browser ready");

	let outcome = drive(&handle, options, store).await;
	let released = handle.release(options.keep_browser).await;
	debug!(?released, "browser released");

	outcome.map(|summary| LoginSummary {
		browser: Some(released),
		..summary
	})
}

async fn drive(handle: &BrowserHandle, options: &LoginOptions, store: &SessionStore) -> Result<LoginSummary> {
	let conn = CdpConnection::connect(handle.ws_url()).await?;
	let probe = CdpProbe::attach(conn, &options.config).await?;
	let result = LoginFlow::new(&options.config, &options.policy).run(&probe, store).await;
	probe.close().await;
	result
}
