use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "chatgpt")]
#[command(about = "ChatGPT CLI - Interact with ChatGPT from your terminal")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug, -vvv trace)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Directory for session.json, headers.json and config.json [default: ~/.chatgpt-cli]
	#[arg(long, global = true, value_name = "DIR")]
	pub config_dir: Option<PathBuf>,

	/// Runs `chat` when omitted
	#[command(subcommand)]
	pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
	/// Log in through Chrome and save the session
	Login(LoginArgs),

	/// Start an interactive chat session
	Chat(ChatArgs),

	/// Report whether the stored session is usable
	Check,

	/// Print cookie diagnostics and remediation hints
	Diagnose,

	/// Copy the home-directory session and headers into the current directory
	SaveLocal,
}

#[derive(Args, Debug, Default, PartialEq)]
pub struct LoginArgs {
	/// Seconds to wait for the login to complete [default: 300]
	#[arg(long, value_name = "SECS")]
	pub timeout: Option<u64>,

	/// Remote debugging port to attach to or launch on
	#[arg(long)]
	pub port: Option<u16>,

	/// Leave a browser launched by this command running
	#[arg(long)]
	pub keep_browser: bool,
}

#[derive(Args, Debug, Default, PartialEq)]
pub struct ChatArgs {
	/// Model slug sent with each turn [default: gpt-4o]
	#[arg(long)]
	pub model: Option<String>,
}
