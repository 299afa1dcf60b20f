//! Agent logic for MaxLab
//!
//! This crate provides the conversation session manager, the notebook chat
//! agent with its personas and reply formatting, and the comm bridge that
//! serves a notebook sidebar.

pub mod agent;
pub mod bridge;
pub mod context;
pub mod failure;
pub mod format;
pub mod session;

pub use agent::{AgentError, AgentOptions, NotebookChatAgent};
pub use bridge::{BridgeReply, ChatBridge, ErrorStatus};
pub use failure::{FailureCategory, SendError};
pub use format::{plain, strip_markdown, tag_as_markdown, Reply, ReplyKind};
pub use session::{ChatEntry, SessionConfig, SessionManager, NO_RESPONSE};
