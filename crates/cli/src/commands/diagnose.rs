use chatgpt::diagnose::{DiagnosticReport, Expiry, PERSISTENT_ISSUE_HINTS, diagnose};
use chatgpt::now_epoch_secs;
use colored::{ColoredString, Colorize};

use super::AppContext;

pub fn run(ctx: &AppContext) {
	let report = diagnose(&ctx.store, &ctx.policy, now_epoch_secs());
	render(&report);
}

fn found(present: bool) -> ColoredString {
	if present { "Found".green() } else { "Not found".red() }
}

fn present(present: bool) -> ColoredString {
	if present { "Present".green() } else { "Missing".red() }
}

fn expiry_line(label: &str, expiry: Option<Expiry>) {
	if let Some(expiry) = expiry {
		let state = if expiry.expired { "Expired".red() } else { "Valid".green() };
		println!("{label} expiration: {state} ({})", expiry.iso());
	}
}

fn render(report: &DiagnosticReport) {
	println!("{}", "ChatGPT CLI - Authentication Diagnostics".blue());
	println!("{}", "---------------------------------------------------".dimmed());

	println!("{}", "\nSession files:".dimmed());
	println!(
		"Home directory session: {} ({})",
		found(report.files.home_session),
		report.home_session_path.display()
	);
	println!(
		"Current directory session: {} ({})",
		found(report.files.local_session),
		report.local_session_path.display()
	);

	let (Some(analysis), Some(location)) = (&report.session, report.session_in_use) else {
		println!(
			"{}",
			"\nNo valid session found. Please run 'chatgpt login' to create a new session.".red()
		);
		return;
	};
	println!("{}", format!("\nUsing session from {location}").green());

	println!("{}", "\nSession analysis:".dimmed());
	if analysis.total_cookies == 0 {
		println!("{}", "No cookies found in session data.".red());
	}
	println!("Total cookies: {}", analysis.total_cookies);
	println!("Session token cookie: {}", present(analysis.session_token));
	println!("PUID cookie: {}", present(analysis.puid));
	println!("CF clearance cookie: {}", present(analysis.clearance));
	expiry_line("Session token", analysis.session_token_expiry);
	expiry_line("CF clearance", analysis.clearance_expiry);
	println!("User agent: {}", present(analysis.user_agent));
	let token = if analysis.access_token {
		"Present".green()
	} else {
		"Missing (not critical)".yellow()
	};
	println!("Access token: {token}");

	println!("{}", "\nRecommendations:".blue());
	for recommendation in &report.recommendations {
		let checklist = recommendation.checklist();
		if checklist.is_empty() {
			println!("{}", format!("- {}", recommendation.message()).yellow());
		} else {
			println!("{}", format!("- {}", recommendation.message()).green());
			for (i, step) in checklist.iter().enumerate() {
				println!("{}", format!("  {}. {step}", i + 1).green());
			}
		}
	}

	println!("{}", "\nFor persistent issues, you may need to:".dimmed());
	for (i, hint) in PERSISTENT_ISSUE_HINTS.iter().enumerate() {
		println!("{}", format!("{}. {hint}", i + 1).dimmed());
	}
}
