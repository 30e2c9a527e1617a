//! Interactive chat loop.

use std::io::Write;

use chatgpt::api::{ApiClient, ChatTransport, TurnOutcome};
use chatgpt::validator::is_valid;
use chatgpt::{ChatMessage, now_epoch_secs};
use colored::Colorize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use super::AppContext;
use crate::cli::ChatArgs;
use crate::error::{CliError, Result};

pub async fn run(ctx: &AppContext, args: ChatArgs) -> Result<()> {
	let session = ctx.store.load_session();
	if !is_valid(session.as_ref(), &ctx.policy, now_epoch_secs()) {
		println!("{}", "You need to login first. Run: chatgpt login".red());
		return Err(CliError::SessionInvalid);
	}

	let config = ctx.settings.api_config(args.model);
	let client = ApiClient::from_store(&ctx.store, config, &ctx.policy)?;
	info!(target = "chatgpt", model = %client.config().model, "chat started");

	let stdin = BufReader::new(tokio::io::stdin());
	let history = chat_loop(&client, stdin, &mut std::io::stdout()).await?;
	debug!(turns = history.len(), "chat ended");
	Ok(())
}

/// Reads prompts until `exit` or end of input. Returns the exchanged messages.
pub async fn chat_loop<T, R, W>(client: &ApiClient<T>, input: R, out: &mut W) -> Result<Vec<ChatMessage>>
where
	T: ChatTransport,
	R: AsyncBufRead + Unpin,
	W: Write,
{
	writeln!(out, "{}", "ChatGPT CLI - Start chatting (type \"exit\" to quit)".green())?;
	writeln!(out, "{}", "---------------------------------------------------".dimmed())?;

	let mut lines = input.lines();
	let mut conversation_id: Option<String> = None;
	let mut history = Vec::new();

	loop {
		write!(out, "{} ", "> You:".blue())?;
		out.flush()?;
		let Some(line) = lines.next_line().await? else {
			writeln!(out)?;
			break;
		};
		let message = line.trim();
		if message.eq_ignore_ascii_case("exit") {
			writeln!(out, "{}", "Goodbye!".yellow())?;
			break;
		}
		if message.is_empty() {
			continue;
		}

		history.push(ChatMessage::user(message));
		writeln!(out, "{}", "ChatGPT is thinking...".dimmed())?;
		let turn = client.send_turn(message, conversation_id.as_deref()).await;
		render_turn(&turn, out)?;

		let response = turn.response;
		if !response.is_error() {
			if !response.conversation_id.is_empty() {
				conversation_id = Some(response.conversation_id.clone());
			}
			history.push(response.message);
		}
	}
	Ok(history)
}

fn render_turn<W: Write>(turn: &TurnOutcome, out: &mut W) -> Result<()> {
	let response = &turn.response;
	if let Some(error) = &response.error {
		writeln!(out, "{}", format!("Error: {error}").red())?;
		if let Some(hint) = turn.guidance() {
			writeln!(out, "{}", hint.yellow())?;
		}
		return Ok(());
	}
	writeln!(out, "{}", "\nChatGPT:".green())?;
	writeln!(out, "{}\n", response.message.content)?;
	Ok(())
}
