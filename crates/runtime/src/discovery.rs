//! Discovery of running debug-enabled browsers and installed executables.

use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

/// Lists remote-debugging ports of running Chrome-family processes, in
/// process-table order with duplicates removed.
pub fn find_debugging_ports() -> Vec<u16> {
	let output = if cfg!(target_os = "windows") {
		Command::new("wmic")
			.args(["process", "where", "name like '%chrome%' or name like '%msedge%'", "get", "commandline"])
			.output()
	} else {
		Command::new("ps").args(["-ax", "-o", "command"]).output()
	};

	match output {
		Ok(output) if output.status.success() => parse_debugging_ports(&String::from_utf8_lossy(&output.stdout)),
		Ok(output) => {
			debug!("process listing exited with {}", output.status);
			Vec::new()
		}
		Err(e) => {
			debug!("process listing failed: {}", e);
			Vec::new()
		}
	}
}

/// Extracts `--remote-debugging-port=<n>` values from Chrome-family command lines.
pub fn parse_debugging_ports(listing: &str) -> Vec<u16> {
	let Ok(pattern) = regex_lite::Regex::new(r"--remote-debugging-port=(\d+)") else {
		return Vec::new();
	};

	let mut ports = Vec::new();
	for line in listing.lines() {
		let lower = line.to_ascii_lowercase();
		let is_browser = ["chrome", "chromium", "msedge", "brave"].iter().any(|name| lower.contains(name));
		if !is_browser {
			continue;
		}
		let Some(port) = pattern.captures(line).and_then(|caps| caps.get(1)).and_then(|m| m.as_str().parse::<u16>().ok()) else {
			continue;
		};
		// Port 0 asks Chrome to choose; it cannot be attached to from the command line alone.
		if port != 0 && !ports.contains(&port) {
			ports.push(port);
		}
	}
	ports
}

/// Finds a Chrome-compatible executable on this machine.
pub fn find_chrome_executable() -> Option<String> {
	let candidates: Vec<String> = if cfg!(target_os = "macos") {
		vec![
			"/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
			"/Applications/Chromium.app/Contents/MacOS/Chromium",
			"/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
			"/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
		]
		.into_iter()
		.map(str::to_string)
		.collect()
	} else if cfg!(target_os = "windows") {
		windows_browser_candidates()
	} else {
		vec![
			"google-chrome-stable",
			"google-chrome",
			"chromium-browser",
			"chromium",
			"brave-browser",
			"/usr/bin/google-chrome-stable",
			"/usr/bin/google-chrome",
			"/usr/bin/chromium-browser",
			"/usr/bin/chromium",
			"/snap/bin/chromium",
		]
		.into_iter()
		.map(str::to_string)
		.collect()
	};

	candidates.into_iter().find(|candidate| {
		if candidate.starts_with('/') || candidate.contains('\\') || candidate.contains(':') {
			std::path::Path::new(candidate).exists()
		} else {
			which::which(candidate).is_ok()
		}
	})
}

fn windows_browser_candidates() -> Vec<String> {
	let mut roots = Vec::new();
	for key in ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"] {
		if let Ok(value) = std::env::var(key) {
			roots.push(PathBuf::from(value));
		}
	}
	if roots.is_empty() {
		roots.push(PathBuf::from(r"C:\Program Files"));
		roots.push(PathBuf::from(r"C:\Program Files (x86)"));
	}

	let suffixes: &[&[&str]] = &[
		&["Google", "Chrome", "Application", "chrome.exe"],
		&["Microsoft", "Edge", "Application", "msedge.exe"],
		&["Chromium", "Application", "chrome.exe"],
	];

	let mut candidates: Vec<String> = roots
		.iter()
		.flat_map(|root| {
			suffixes.iter().map(move |suffix| {
				let mut path = root.clone();
				path.extend(suffix.iter());
				path.to_string_lossy().to_string()
			})
		})
		.collect();

	candidates.extend(["chrome.exe", "msedge.exe"].map(str::to_string));
	candidates
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_ports_from_chrome_command_lines() {
		let listing = "\
/usr/bin/bash
/opt/google/chrome/chrome --type=browser --remote-debugging-port=9222 --user-data-dir=/tmp/p
/opt/google/chrome/chrome --type=renderer --remote-debugging-port=9222
/usr/lib/chromium/chromium --remote-debugging-port=9333
/usr/bin/node server.js --remote-debugging-port=9444
";
		assert_eq!(parse_debugging_ports(listing), vec![9222, 9333]);
	}

	#[test]
	fn ignores_dynamic_port_requests() {
		assert!(parse_debugging_ports("chrome --remote-debugging-port=0").is_empty());
	}

	#[test]
	fn empty_listing_yields_no_ports() {
		assert!(parse_debugging_ports("").is_empty());
	}

	#[test]
	fn windows_candidates_include_edge() {
		assert!(windows_browser_candidates().iter().any(|c| c.ends_with("msedge.exe")));
	}
}
