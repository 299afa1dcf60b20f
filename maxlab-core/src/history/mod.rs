//! Conversation history
//!
//! The history log is an ordered list of role-tagged, timestamped turns.
//! It belongs to whoever drives the conversation (the chat bridge); the
//! session manager only ever sees it through `HistoryStore`.

pub mod log;
pub mod store;

pub use log::{HistoryStore, JsonHistoryFile, MemoryHistory};
pub use store::{Role, Turn};
