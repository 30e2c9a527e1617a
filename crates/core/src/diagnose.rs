//! Troubleshooting report over the stored session.
//!
//! [`analyze`] is a pure function of file presence, the loaded session and
//! the current time; [`diagnose`] gathers those from a [`SessionStore`].

use std::path::PathBuf;

use chatgpt_protocol::{Cookie, SessionData};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::config::CookiePolicy;
use crate::store::{FilePresence, Location, SessionStore};

/// Hints printed regardless of the session state.
pub const PERSISTENT_ISSUE_HINTS: [&str; 3] = [
	"Use a different browser for login",
	"Clear all cookies for chatgpt.com and openai.com domains",
	"Disable browser extensions that might interfere with the login process",
];

/// Expiry of a cookie that carries one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Expiry {
	pub expires: f64,
	pub expired: bool,
}

impl Expiry {
	fn of(cookie: &Cookie, now: f64) -> Option<Self> {
		cookie.expires.map(|expires| Self {
			expires,
			expired: !cookie.is_live_at(now),
		})
	}

	pub fn at(&self) -> Option<DateTime<Utc>> {
		DateTime::from_timestamp(self.expires as i64, 0)
	}

	/// RFC 3339 timestamp, or the raw epoch value when out of range.
	pub fn iso(&self) -> String {
		self.at()
			.map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true))
			.unwrap_or_else(|| self.expires.to_string())
	}
}

/// What the loaded session contains.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionAnalysis {
	pub total_cookies: usize,
	pub session_token: bool,
	pub puid: bool,
	pub clearance: bool,
	pub session_token_expiry: Option<Expiry>,
	pub clearance_expiry: Option<Expiry>,
	pub user_agent: bool,
	pub access_token: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recommendation {
	RefreshSessionToken,
	RefreshClearance,
	RefreshPuid,
	/// Everything present and unexpired.
	LooksValid,
}

impl Recommendation {
	pub fn message(&self) -> &'static str {
		match self {
			Self::RefreshSessionToken => "Session token is missing or expired. Run 'chatgpt login' to refresh your session.",
			Self::RefreshClearance => {
				"Cloudflare clearance cookie is missing or expired. Run 'chatgpt login' to refresh your session."
			}
			Self::RefreshPuid => "PUID cookie is missing. Run 'chatgpt login' to refresh your session.",
			Self::LooksValid => "Your session appears to be valid. If you're still experiencing issues:",
		}
	}

	/// Follow-up steps shown under [`Recommendation::LooksValid`].
	pub fn checklist(&self) -> &'static [&'static str] {
		match self {
			Self::LooksValid => &[
				"Try running 'chatgpt login' to refresh your session",
				"Make sure you're not using a VPN or proxy that might be blocked by Cloudflare",
				"Try clearing your browser cookies and logging in again",
			],
			_ => &[],
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticReport {
	pub home_session_path: PathBuf,
	pub local_session_path: PathBuf,
	pub files: FilePresence,
	/// Where the analyzed session was read from.
	pub session_in_use: Option<Location>,
	/// `None` when no session could be loaded.
	pub session: Option<SessionAnalysis>,
	pub recommendations: Vec<Recommendation>,
}

/// Builds the report from the store's current files.
pub fn diagnose(store: &SessionStore, policy: &CookiePolicy, now: f64) -> DiagnosticReport {
	let paths = store.paths();
	analyze(
		paths.home_session(),
		paths.local_session(),
		store.presence(),
		store.load_session_located(),
		policy,
		now,
	)
}

pub fn analyze(
	home_session_path: PathBuf,
	local_session_path: PathBuf,
	files: FilePresence,
	loaded: Option<(SessionData, Location)>,
	policy: &CookiePolicy,
	now: f64,
) -> DiagnosticReport {
	let session_in_use = loaded.as_ref().map(|(_, location)| *location);
	let session = loaded.map(|(session, _)| analyze_session(&session, policy, now));
	let recommendations = session.as_ref().map(recommend).unwrap_or_default();
	DiagnosticReport {
		home_session_path,
		local_session_path,
		files,
		session_in_use,
		session,
		recommendations,
	}
}

fn analyze_session(session: &SessionData, policy: &CookiePolicy, now: f64) -> SessionAnalysis {
	let token = session.cookie_with_prefix(&policy.session_token_prefix);
	let clearance = session.cookie(&policy.clearance);
	SessionAnalysis {
		total_cookies: session.cookies.len(),
		session_token: token.is_some(),
		puid: session.cookie(&policy.puid).is_some(),
		clearance: clearance.is_some(),
		session_token_expiry: token.and_then(|c| Expiry::of(c, now)),
		clearance_expiry: clearance.and_then(|c| Expiry::of(c, now)),
		user_agent: !session.user_agent.is_empty(),
		access_token: session.access_token.as_deref().is_some_and(|t| !t.is_empty()),
	}
}

fn recommend(analysis: &SessionAnalysis) -> Vec<Recommendation> {
	let expired = |e: Option<Expiry>| e.is_some_and(|e| e.expired);
	let token_ok = analysis.session_token && !expired(analysis.session_token_expiry);
	let clearance_ok = analysis.clearance && !expired(analysis.clearance_expiry);

	let mut out = Vec::new();
	if !token_ok {
		out.push(Recommendation::RefreshSessionToken);
	}
	if !clearance_ok {
		out.push(Recommendation::RefreshClearance);
	}
	if !analysis.puid {
		out.push(Recommendation::RefreshPuid);
	}
	if out.is_empty() {
		out.push(Recommendation::LooksValid);
	}
	out
}
