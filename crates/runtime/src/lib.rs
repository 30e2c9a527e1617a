//! Browser process lifecycle and DevTools Protocol connection.
//!
//! This crate owns everything that touches a real browser process:
//! finding one that already exposes a remote-debugging port, launching a
//! fresh one, tracking whether this run owns it, probing its HTTP
//! endpoint, and speaking CDP over the browser WebSocket.

pub mod browser;
pub mod connection;
pub mod discovery;
pub mod endpoint;
pub mod error;
pub mod launcher;
pub mod process;

pub use browser::{AcquireOptions, BrowserHandle, ReleaseOutcome};
pub use connection::CdpConnection;
pub use endpoint::{CdpVersionInfo, fetch_cdp_endpoint};
pub use error::{Result, RuntimeError};
