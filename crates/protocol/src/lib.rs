//! Wire and persistence types for the chatgpt CLI.
//!
//! This crate contains the serde-serializable shapes that cross a boundary:
//! session files written to disk, the conversation payload and event-stream
//! frames exchanged with the chat backend, and the Chrome DevTools Protocol
//! messages exchanged with the browser.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization and small accessors
//! * 1:1 with the format on the wire or on disk
//! * Stable: Changes only when a persisted or wire format changes
//!
//! Domain logic (validation, filtering, retry) lives in `chatgpt-core`.

pub mod cdp;
pub mod chat;
pub mod cookie;
pub mod session;

pub use chat::*;
pub use cookie::*;
pub use session::*;
