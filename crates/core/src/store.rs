//! Flat JSON persistence for the captured session and request headers.
//!
//! Two locations are kept: a per-user config directory and the current
//! working directory. Reads prefer the working-directory copy; writes go to
//! both. Missing or unreadable files load as "nothing stored".

use std::fs;
use std::path::{Path, PathBuf};

use chatgpt_protocol::{HeaderMap, SessionData};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{Error, Result};

pub const SESSION_FILE: &str = "session.json";
pub const HEADERS_FILE: &str = "headers.json";
pub const CONFIG_DIR_NAME: &str = ".chatgpt-cli";

/// Directories holding the session files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
	/// Per-user config directory, `~/.chatgpt-cli` by default.
	pub home_dir: PathBuf,
	/// Override directory, the current working directory by default.
	pub local_dir: PathBuf,
}

impl StorePaths {
	pub fn new(home_dir: impl Into<PathBuf>, local_dir: impl Into<PathBuf>) -> Self {
		Self {
			home_dir: home_dir.into(),
			local_dir: local_dir.into(),
		}
	}

	/// Default layout: `~/.chatgpt-cli` plus the current directory.
	pub fn discover() -> Result<Self> {
		let home = dirs::home_dir().ok_or_else(|| Error::Config("could not determine home directory".into()))?;
		Ok(Self::new(home.join(CONFIG_DIR_NAME), std::env::current_dir()?))
	}

	pub fn home_session(&self) -> PathBuf {
		self.home_dir.join(SESSION_FILE)
	}

	pub fn home_headers(&self) -> PathBuf {
		self.home_dir.join(HEADERS_FILE)
	}

	pub fn local_session(&self) -> PathBuf {
		self.local_dir.join(SESSION_FILE)
	}

	pub fn local_headers(&self) -> PathBuf {
		self.local_dir.join(HEADERS_FILE)
	}
}

/// Where a loaded file came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
	Local,
	Home,
}

impl std::fmt::Display for Location {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Local => f.write_str("current directory"),
			Self::Home => f.write_str("home config directory"),
		}
	}
}

/// Which session files exist on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilePresence {
	pub home_session: bool,
	pub local_session: bool,
	pub home_headers: bool,
	pub local_headers: bool,
}

/// Result of copying the home-directory files into the local directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyOutcome {
	pub headers_copied: bool,
}

/// Reads and writes `session.json` and `headers.json`.
#[derive(Debug, Clone)]
pub struct SessionStore {
	paths: StorePaths,
}

impl SessionStore {
	pub fn new(paths: StorePaths) -> Self {
		Self { paths }
	}

	pub fn paths(&self) -> &StorePaths {
		&self.paths
	}

	pub fn presence(&self) -> FilePresence {
		FilePresence {
			home_session: self.paths.home_session().is_file(),
			local_session: self.paths.local_session().is_file(),
			home_headers: self.paths.home_headers().is_file(),
			local_headers: self.paths.local_headers().is_file(),
		}
	}

	/// Loads the session, preferring the local copy.
	///
	/// A local file that cannot be parsed is skipped in favour of the home copy.
	pub fn load_session(&self) -> Option<SessionData> {
		self.load_session_located().map(|(session, _)| session)
	}

	pub fn load_session_located(&self) -> Option<(SessionData, Location)> {
		let local = self.paths.local_session();
		if local.is_file() {
			if let Some(session) = read_json(&local) {
				return Some((session, Location::Local));
			}
			warn!(path = %local.display(), "local session unreadable, falling back to home copy");
		}
		read_json(&self.paths.home_session()).map(|session| (session, Location::Home))
	}

	/// Loads the header map with the same precedence. Absence yields an empty map.
	pub fn load_headers(&self) -> HeaderMap {
		self.pick(self.paths.local_headers(), self.paths.home_headers())
			.and_then(|(path, _)| read_json(&path))
			.unwrap_or_default()
	}

	/// Writes the session to the home and local directories.
	pub fn save_session(&self, session: &SessionData) -> Result<()> {
		write_json(&self.paths.home_session(), session)?;
		write_json(&self.paths.local_session(), session)?;
		debug!(cookies = session.cookies.len(), "session saved");
		Ok(())
	}

	/// Writes the header map to the home and local directories.
	pub fn save_headers(&self, headers: &HeaderMap) -> Result<()> {
		write_json(&self.paths.home_headers(), headers)?;
		write_json(&self.paths.local_headers(), headers)?;
		debug!(headers = headers.len(), "headers saved");
		Ok(())
	}

	/// Copies the home-directory session (required) and headers (optional)
	/// into the local directory.
	pub fn copy_to_local(&self) -> Result<CopyOutcome> {
		let session: SessionData = read_json(&self.paths.home_session()).ok_or(Error::NoSession)?;
		write_json(&self.paths.local_session(), &session)?;

		let headers: Option<HeaderMap> = read_json(&self.paths.home_headers());
		if let Some(headers) = &headers {
			write_json(&self.paths.local_headers(), headers)?;
		}
		Ok(CopyOutcome {
			headers_copied: headers.is_some(),
		})
	}

	fn pick(&self, local: PathBuf, home: PathBuf) -> Option<(PathBuf, Location)> {
		if local.is_file() {
			Some((local, Location::Local))
		} else if home.is_file() {
			Some((home, Location::Home))
		} else {
			None
		}
	}
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
	let content = match fs::read_to_string(path) {
		Ok(content) => content,
		Err(err) => {
			debug!(path = %path.display(), error = %err, "file not readable");
			return None;
		}
	};
	match serde_json::from_str(&content) {
		Ok(value) => Some(value),
		Err(err) => {
			warn!(path = %path.display(), error = %err, "ignoring corrupt file");
			None
		}
	}
}

/// Pretty JSON through a sibling temp file and a rename.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
	if let Some(parent) = path.parent() {
		if !parent.as_os_str().is_empty() {
			fs::create_dir_all(parent)?;
		}
	}
	let json = serde_json::to_string_pretty(value)?;
	let tmp = path.with_extension("json.tmp");
	fs::write(&tmp, json)?;
	fs::rename(&tmp, path)?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use chatgpt_protocol::Cookie;
	use tempfile::TempDir;

	use super::*;

	fn store(tmp: &TempDir) -> SessionStore {
		SessionStore::new(StorePaths::new(tmp.path().join("home"), tmp.path().join("cwd")))
	}

	fn sample() -> SessionData {
		SessionData {
			cookies: vec![
				Cookie::new("__Secure-next-auth.session-token", "tok", "chatgpt.com").with_expires(1_900_000_000.0),
				Cookie {
					http_only: true,
					secure: true,
					same_site: Some("Lax".into()),
					..Cookie::new("cf_clearance", "cf", ".chatgpt.com")
				},
			],
			user_agent: "Mozilla/5.0 Test".into(),
			access_token: Some("eyJ".into()),
		}
	}

	#[test]
	fn empty_store_loads_nothing() {
		let tmp = TempDir::new().unwrap();
		let store = store(&tmp);
		assert!(store.load_session().is_none());
		assert!(store.load_headers().is_empty());
		assert_eq!(store.presence(), FilePresence::default());
	}

	#[test]
	fn saved_session_loads_back_equal() {
		let tmp = TempDir::new().unwrap();
		let store = store(&tmp);
		let session = sample();
		store.save_session(&session).unwrap();

		assert!(store.paths().home_session().is_file());
		assert!(store.paths().local_session().is_file());
		assert_eq!(store.load_session(), Some(session));
		assert!(!store.paths().home_dir.join("session.json.tmp").exists());
	}

	#[test]
	fn local_copy_wins() {
		let tmp = TempDir::new().unwrap();
		let store = store(&tmp);
		let home = sample();
		write_json(&store.paths().home_session(), &home).unwrap();
		let mut local = sample();
		local.user_agent = "local".into();
		write_json(&store.paths().local_session(), &local).unwrap();

		let (loaded, location) = store.load_session_located().unwrap();
		assert_eq!(loaded.user_agent, "local");
		assert_eq!(location, Location::Local);
	}

	#[test]
	fn home_used_when_no_local() {
		let tmp = TempDir::new().unwrap();
		let store = store(&tmp);
		write_json(&store.paths().home_session(), &sample()).unwrap();
		let (_, location) = store.load_session_located().unwrap();
		assert_eq!(location, Location::Home);
	}

	#[test]
	fn truncated_file_is_no_session() {
		let tmp = TempDir::new().unwrap();
		let store = store(&tmp);
		fs::create_dir_all(&store.paths().home_dir).unwrap();
		fs::write(store.paths().home_session(), "{\"cookies\": [").unwrap();
		assert!(store.load_session().is_none());
	}

	#[test]
	fn corrupt_local_copy_falls_back_to_home() {
		let tmp = TempDir::new().unwrap();
		let store = store(&tmp);
		write_json(&store.paths().home_session(), &sample()).unwrap();
		fs::create_dir_all(&store.paths().local_dir).unwrap();
		fs::write(store.paths().local_session(), "not json").unwrap();

		let (loaded, location) = store.load_session_located().unwrap();
		assert_eq!(location, Location::Home);
		assert_eq!(loaded, sample());
		assert!(store.presence().local_session);
	}

	#[test]
	fn corrupt_local_copy_without_home_is_no_session() {
		let tmp = TempDir::new().unwrap();
		let store = store(&tmp);
		fs::create_dir_all(&store.paths().local_dir).unwrap();
		fs::write(store.paths().local_session(), "{").unwrap();
		assert!(store.load_session_located().is_none());
	}

	#[test]
	fn headers_round_trip_with_precedence() {
		let tmp = TempDir::new().unwrap();
		let store = store(&tmp);
		let mut headers = HeaderMap::new();
		headers.insert("oai-device-id".into(), "abc".into());
		store.save_headers(&headers).unwrap();
		assert_eq!(store.load_headers(), headers);

		let mut local = HeaderMap::new();
		local.insert("oai-language".into(), "en-US".into());
		write_json(&store.paths().local_headers(), &local).unwrap();
		assert_eq!(store.load_headers(), local);
	}

	#[test]
	fn copy_to_local_requires_home_session() {
		let tmp = TempDir::new().unwrap();
		let store = store(&tmp);
		assert!(matches!(store.copy_to_local(), Err(Error::NoSession)));
	}

	#[test]
	fn copy_to_local_copies_headers_when_present() {
		let tmp = TempDir::new().unwrap();
		let store = store(&tmp);
		write_json(&store.paths().home_session(), &sample()).unwrap();

		let outcome = store.copy_to_local().unwrap();
		assert!(!outcome.headers_copied);
		assert!(store.paths().local_session().is_file());
		assert!(!store.paths().local_headers().exists());

		write_json(&store.paths().home_headers(), &HeaderMap::from([("a".to_string(), "b".to_string())])).unwrap();
		assert!(store.copy_to_local().unwrap().headers_copied);
		assert!(store.paths().local_headers().is_file());
	}
}
