use chatgpt::validator::{CookieState, CredentialStatus, is_valid};
use chatgpt::now_epoch_secs;
use colored::Colorize;
use tracing::info;

use super::AppContext;
use crate::error::{CliError, Result};

/// Prints per-cookie state and fails when the session is unusable.
pub fn run(ctx: &AppContext) -> Result<()> {
	let Some((session, location)) = ctx.store.load_session_located() else {
		println!("{}", "No session found.".red());
		return Err(CliError::SessionInvalid);
	};
	info!(target = "chatgpt", %location, "checking session");
	println!("Session loaded from {location}");

	let now = now_epoch_secs();
	let status = CredentialStatus::evaluate(&session.cookies, &ctx.policy, now);
	for (label, state) in [
		("Session token cookie", status.session_token),
		("PUID cookie", status.puid),
		("CF clearance cookie", status.clearance),
	] {
		println!("{label}: {}", describe(state));
	}

	if is_valid(Some(&session), &ctx.policy, now) {
		println!("{}", "Session valid".green());
		Ok(())
	} else {
		println!("{}", "Session invalid".red());
		Err(CliError::SessionInvalid)
	}
}

fn describe(state: CookieState) -> colored::ColoredString {
	match state {
		CookieState::Live => "Found".green(),
		CookieState::Expired => "Expired".yellow(),
		CookieState::Missing => "Not found".red(),
	}
}
