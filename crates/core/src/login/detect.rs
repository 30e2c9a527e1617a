//! Login detection over an observed page state.
//!
//! [`is_logged_in`] is pure so every branch of the heuristic can be tested
//! from fixed snapshots.

use url::Url;

use crate::validator::CredentialStatus;

/// URL patterns that classify the page the browser is on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRules {
	/// Hosts (and their subdomains) that serve the chat UI.
	pub chat_hosts: Vec<String>,
	/// Path fragments of an open conversation.
	pub conversation_markers: Vec<String>,
	/// Path fragments of pages shown only before login completes.
	pub login_markers: Vec<String>,
}

impl Default for UrlRules {
	fn default() -> Self {
		Self {
			chat_hosts: vec!["chatgpt.com".into(), "chat.openai.com".into()],
			conversation_markers: vec!["/c/".into(), "/chat/".into()],
			login_markers: vec!["/auth/login".into(), "/auth/callback".into(), "/auth/signup".into()],
		}
	}
}

impl UrlRules {
	pub fn is_chat_host(&self, url: &str) -> bool {
		let Some(host) = Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_ascii_lowercase)) else {
			return false;
		};
		self.chat_hosts
			.iter()
			.any(|h| host == *h || host.strip_suffix(h.as_str()).is_some_and(|rest| rest.ends_with('.')))
	}

	pub fn is_conversation(&self, url: &str) -> bool {
		path_matches(url, &self.conversation_markers)
	}

	pub fn is_login_page(&self, url: &str) -> bool {
		path_matches(url, &self.login_markers)
	}
}

fn path_matches(url: &str, markers: &[String]) -> bool {
	let path = Url::parse(url).map(|u| u.path().to_string()).unwrap_or_default();
	markers.iter().any(|m| path.contains(m.as_str()))
}

/// What one poll tick observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
	pub url: String,
	/// Chat interface elements are rendered.
	pub chat_ui: bool,
	/// The account menu button is rendered.
	pub user_menu: bool,
	/// Credential cookies present in the browser jar (expiry ignored).
	pub cookies: CredentialStatus,
}

impl PageSnapshot {
	fn has_ui_markers(&self) -> bool {
		self.chat_ui || self.user_menu
	}

	fn has_any_credential(&self) -> bool {
		self.cookies.session_token.is_present() || self.cookies.puid.is_present() || self.cookies.clearance.is_present()
	}
}

/// Decides whether the snapshot shows a completed login.
///
/// All rules require a chat host. Any one of them suffices:
///
/// 1. A conversation page with an auth signal: any credential cookie, or the UI markers.
/// 2. Outside the login pages, with the full credential combination
///    (session token, or PUID together with clearance).
/// 3. Outside the login pages, with UI markers and the session token.
pub fn is_logged_in(snapshot: &PageSnapshot, rules: &UrlRules) -> bool {
	let url = snapshot.url.as_str();
	if !rules.is_chat_host(url) {
		return false;
	}
	let on_login_page = rules.is_login_page(url);

	if rules.is_conversation(url) && (snapshot.has_any_credential() || snapshot.has_ui_markers()) {
		return true;
	}
	if !on_login_page && snapshot.cookies.is_sufficient() {
		return true;
	}
	!on_login_page && snapshot.has_ui_markers() && snapshot.cookies.session_token.is_present()
}
