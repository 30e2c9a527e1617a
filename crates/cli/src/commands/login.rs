use chatgpt::login::{self, LoginSummary};
use chatgpt_runtime::ReleaseOutcome;
use colored::Colorize;
use tracing::info;

use super::AppContext;
use crate::cli::LoginArgs;
use crate::error::Result;

const LOGIN_TIPS: [&str; 3] = [
	"Complete any CAPTCHA or verification challenges",
	"Make sure you're using the correct OpenAI account",
	"Try again with 'chatgpt login'",
];

pub async fn run(ctx: &AppContext, args: &LoginArgs) -> Result<()> {
	let options = ctx
		.settings
		.login_options(args, &ctx.store.paths().home_dir, ctx.policy.clone());
	info!(target = "chatgpt", port = ?options.browser.port, timeout = ?options.config.timeout, "starting login");

	println!("{}", "Chrome will open for you to log in to ChatGPT.".yellow());
	println!("{}", "Please complete any verification challenges and log in.".yellow());
	println!(
		"{}",
		format!(
			"The CLI continues automatically once you're logged in (waiting up to {} seconds).",
			options.config.timeout.as_secs()
		)
		.yellow()
	);

	match login::login(&options, &ctx.store).await {
		Ok(summary) => {
			report(&summary);
			Ok(())
		}
		Err(err) => {
			println!("{}", format!("\nLogin failed: {err}").red());
			println!("{}", "\nTips for successful login:".yellow());
			for (i, tip) in LOGIN_TIPS.iter().enumerate() {
				println!("{}", format!("{}. {tip}", i + 1).yellow());
			}
			Err(err.into())
		}
	}
}

fn report(summary: &LoginSummary) {
	if summary.missing_expected.is_empty() {
		println!("{}", "All essential cookies captured successfully!".green());
	} else {
		println!(
			"{}",
			format!("Warning: Missing some cookies: {}", summary.missing_expected.join(", ")).yellow()
		);
	}
	if !summary.has_clearance {
		println!(
			"{}",
			"Warning: Missing Cloudflare clearance cookie. This may cause issues with API access.".yellow()
		);
	}
	if !summary.has_access_token {
		println!(
			"{}",
			"Could not retrieve access token. Some features might not work properly.".yellow()
		);
	}
	println!(
		"{}",
		format!(
			"Saved {} of {} cookies and {} headers",
			summary.saved_cookie_names.len(),
			summary.cookies_captured,
			summary.headers_captured
		)
		.dimmed()
	);
	println!("{}", format!("Captured cookies: {}", summary.saved_cookie_names.join(", ")).dimmed());

	match summary.browser {
		Some(ReleaseOutcome::LeftRunning { port }) => {
			println!("{}", format!("Leaving existing Chrome instance on port {port} running").dimmed())
		}
		Some(ReleaseOutcome::KeptRunning { pid, port }) => {
			println!("{}", format!("Chrome (pid {pid}) left running on port {port}").dimmed())
		}
		Some(ReleaseOutcome::Terminated { .. } | ReleaseOutcome::AlreadyExited { .. }) => {
			println!("{}", "Closed Chrome instance".dimmed())
		}
		None => {}
	}
	println!("{}", "\nSuccessfully logged in and saved session".green());
	println!("{}", "You can now use 'chatgpt' to start chatting!".green());
}
