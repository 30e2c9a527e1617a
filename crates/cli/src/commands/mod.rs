//! Command dispatch and shared command context.

mod chat;
mod check;
mod diagnose;
mod login;
mod save_local;

use chatgpt::{CookiePolicy, SessionStore, StorePaths};

use crate::cli::{ChatArgs, Cli, Commands};
use crate::error::Result;
use crate::settings::Settings;

/// Store, settings and cookie policy resolved from global flags.
pub struct AppContext {
	pub store: SessionStore,
	pub settings: Settings,
	pub policy: CookiePolicy,
}

impl AppContext {
	pub fn from_cli(cli: &Cli) -> Result<Self> {
		let paths = match &cli.config_dir {
			Some(dir) => StorePaths::new(dir, std::env::current_dir()?),
			None => StorePaths::discover()?,
		};
		let settings = Settings::load(&paths.home_dir);
		Ok(Self {
			store: SessionStore::new(paths),
			settings,
			policy: CookiePolicy::default(),
		})
	}
}

pub async fn dispatch(cli: Cli) -> Result<()> {
	let ctx = AppContext::from_cli(&cli)?;
	match cli.command.unwrap_or_else(|| Commands::Chat(ChatArgs::default())) {
		Commands::Login(args) => login::run(&ctx, &args).await,
		Commands::Chat(args) => chat::run(&ctx, args).await,
		Commands::Check => check::run(&ctx),
		Commands::Diagnose => {
			diagnose::run(&ctx);
			Ok(())
		}
		Commands::SaveLocal => save_local::run(&ctx),
	}
}
