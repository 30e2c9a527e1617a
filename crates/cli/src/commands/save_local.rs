use colored::Colorize;
use tracing::warn;

use super::AppContext;
use crate::error::Result;

pub fn run(ctx: &AppContext) -> Result<()> {
	let outcome = ctx.store.copy_to_local()?;
	let paths = ctx.store.paths();
	println!("{} {}", "Session saved to".green(), paths.local_session().display());
	if outcome.headers_copied {
		println!("{} {}", "Headers saved to".green(), paths.local_headers().display());
	} else {
		warn!(target = "chatgpt", "no headers found to copy");
		println!("{}", "No headers found to save to current directory".yellow());
	}
	Ok(())
}
