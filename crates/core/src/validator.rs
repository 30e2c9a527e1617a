//! Decides whether a stored session can be used without logging in again.
//!
//! The backend accepts either a live auth session-token cookie, or the pair
//! of a live `_puid` and a live Cloudflare clearance cookie.

use chatgpt_protocol::{Cookie, SessionData};

use crate::config::CookiePolicy;

/// State of one credential cookie at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieState {
	Missing,
	Expired,
	Live,
}

impl CookieState {
	fn of(cookie: Option<&Cookie>, now: f64) -> Self {
		match cookie {
			None => Self::Missing,
			Some(c) if c.is_live_at(now) => Self::Live,
			Some(_) => Self::Expired,
		}
	}

	pub fn is_live(self) -> bool {
		self == Self::Live
	}

	pub fn is_present(self) -> bool {
		self != Self::Missing
	}
}

/// The three credential cookies, each located by the first matching name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialStatus {
	pub session_token: CookieState,
	pub puid: CookieState,
	pub clearance: CookieState,
}

impl CredentialStatus {
	/// Evaluates `cookies` against wall-clock `now` (epoch seconds).
	pub fn evaluate(cookies: &[Cookie], policy: &CookiePolicy, now: f64) -> Self {
		let token = cookies.iter().find(|c| policy.is_session_token(&c.name));
		let puid = cookies.iter().find(|c| c.name == policy.puid);
		let clearance = cookies.iter().find(|c| c.name == policy.clearance);
		Self {
			session_token: CookieState::of(token, now),
			puid: CookieState::of(puid, now),
			clearance: CookieState::of(clearance, now),
		}
	}

	/// Presence only, ignoring expiry. Used on freshly captured browser jars.
	pub fn presence(cookies: &[Cookie], policy: &CookiePolicy) -> Self {
		Self::evaluate(cookies, policy, f64::NEG_INFINITY)
	}

	/// Session token, or PUID together with clearance.
	pub fn is_sufficient(&self) -> bool {
		self.session_token.is_live() || (self.puid.is_live() && self.clearance.is_live())
	}

	/// Names of the credential cookies that are not live, in a fixed order.
	/// Empty when [`is_sufficient`](Self::is_sufficient) holds.
	pub fn missing_critical(&self, policy: &CookiePolicy) -> Vec<String> {
		if self.is_sufficient() {
			return Vec::new();
		}
		let mut missing = Vec::new();
		if !self.session_token.is_live() {
			missing.push(policy.session_token_prefix.clone());
		}
		if !self.puid.is_live() {
			missing.push(policy.puid.clone());
		}
		if !self.clearance.is_live() {
			missing.push(policy.clearance.clone());
		}
		missing
	}
}

/// Returns `true` if `session` carries a usable credential combination at `now`.
pub fn is_valid(session: Option<&SessionData>, policy: &CookiePolicy, now: f64) -> bool {
	session.is_some_and(|s| CredentialStatus::evaluate(&s.cookies, policy, now).is_sufficient())
}
