//! Port and process-group helpers for owned browser instances.

use std::process::Child;

/// Returns `true` when `port` can be bound on localhost.
pub fn port_available(port: u16) -> bool {
	std::net::TcpListener::bind(("127.0.0.1", port)).is_ok()
}

/// Asks the OS for an unused localhost port.
///
/// The listener is dropped before returning, so another process may grab the
/// port first; callers launching a browser on it must tolerate that.
pub fn free_port() -> std::io::Result<u16> {
	let listener = std::net::TcpListener::bind(("127.0.0.1", 0))?;
	Ok(listener.local_addr()?.port())
}

/// Places a spawned command in its own process group so the whole browser
/// tree can be signalled at once.
pub fn detach_process_group(cmd: &mut std::process::Command) {
	#[cfg(unix)]
	std::os::unix::process::CommandExt::process_group(cmd, 0);
	#[cfg(not(unix))]
	let _ = cmd;
}

/// Politely asks the process group led by `child` to exit.
///
/// Returns `false` if the signal could not be delivered; the caller falls
/// back to [`Child::kill`].
pub fn request_group_exit(child: &Child) -> bool {
	#[cfg(unix)]
	{
		std::process::Command::new("kill")
			.args(["-TERM", &format!("-{}", child.id())])
			.status()
			.map(|status| status.success())
			.unwrap_or(false)
	}

	#[cfg(not(unix))]
	{
		let _ = child;
		false
	}
}
