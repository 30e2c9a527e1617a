//! Cookie names and domains the backend and its anti-bot layer care about.
//!
//! Kept as data so validation, filtering and login detection can be driven
//! by a different policy in tests.

/// Cookie selection and validation policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookiePolicy {
	/// Name prefix of the (possibly chunked) auth session cookie.
	pub session_token_prefix: String,
	/// Provider user-id cookie.
	pub puid: String,
	/// Cloudflare clearance cookie.
	pub clearance: String,
	/// Names always sent, in priority order.
	pub priority_names: Vec<String>,
	/// Domain substrings whose cookies may fill remaining slots.
	pub relevant_domains: Vec<String>,
	/// Domain-based cookies are only added while the priority set is smaller than this.
	pub domain_fill_threshold: usize,
	/// Upper bound on cookies sent in one request.
	pub max_cookies: usize,
	/// Names whose absence after login is worth a warning.
	pub expected_names: Vec<String>,
}

impl Default for CookiePolicy {
	fn default() -> Self {
		let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
		Self {
			session_token_prefix: "__Secure-next-auth.session-token".into(),
			puid: "_puid".into(),
			clearance: "cf_clearance".into(),
			priority_names: strings(&[
				"__Secure-next-auth.session-token",
				"__Secure-next-auth.session-token.0",
				"__Secure-next-auth.session-token.1",
				"_puid",
				"cf_clearance",
				"__cf_bm",
				"oai-sc",
				"__Secure-next-auth.callback-url",
				"__Host-next-auth.csrf-token",
				"oai-did",
				"oai-gn",
				"oai-hm",
				"oai-hlib",
				"oai-nav-state",
				"oai-last-model",
				"_uasid",
				"_umsid",
			]),
			relevant_domains: strings(&[
				"chat.openai.com",
				"chatgpt.com",
				"openai.com",
				"auth0.openai.com",
				"auth.openai.com",
				"cloudflare",
			]),
			domain_fill_threshold: 20,
			max_cookies: 30,
			expected_names: strings(&[
				"__Secure-next-auth.session-token",
				"__Secure-next-auth.session-token.0",
				"__Secure-next-auth.session-token.1",
				"_puid",
				"cf_clearance",
			]),
		}
	}
}

impl CookiePolicy {
	pub fn is_session_token(&self, name: &str) -> bool {
		name.starts_with(&self.session_token_prefix)
	}

	pub fn is_priority(&self, name: &str) -> bool {
		self.priority_names.iter().any(|n| n == name)
	}

	pub fn is_relevant_domain(&self, domain: &str) -> bool {
		self.relevant_domains.iter().any(|d| domain.contains(d.as_str()))
	}
}
