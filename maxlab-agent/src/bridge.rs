//! Comm bridge between a notebook sidebar and the agent
//!
//! Each inbound line is one JSON message tagged by `type`; each reply is one
//! JSON line. The bridge owns the history log and keeps it in step with the
//! agent session.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};

use maxlab_core::history::{HistoryStore, JsonHistoryFile, Turn};

use crate::agent::NotebookChatAgent;

/// Inbound comm message
#[derive(Debug, Deserialize)]
struct Inbound {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    content: Option<String>,
}

/// Outbound comm message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeReply {
    Initialized,
    Response { content: String, timestamp: String },
    History { history: Vec<Turn> },
    Cleared,
    Error {
        status: ErrorStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStatus {
    EmptyMessage,
    UnknownMessageType,
    InternalError,
}

impl BridgeReply {
    fn error(status: ErrorStatus, content: Option<String>) -> Self {
        BridgeReply::Error { status, content }
    }
}

/// Serves comm messages for one agent
pub struct ChatBridge<H: HistoryStore> {
    agent: Arc<NotebookChatAgent>,
    history: H,
}

impl ChatBridge<JsonHistoryFile> {
    /// Open the history file at `path`. A file that cannot be read is
    /// logged and replaced by an empty history.
    pub async fn open<P: AsRef<Path>>(agent: Arc<NotebookChatAgent>, path: P) -> Self {
        let history = match JsonHistoryFile::open(path.as_ref()) {
            Ok(history) => history,
            Err(e) => {
                error!("Failed to load history: {}", e);
                JsonHistoryFile::new(path)
            }
        };
        Self::new(agent, history).await
    }
}

impl<H: HistoryStore> ChatBridge<H> {
    /// Wrap `history` and seed the agent session with it
    pub async fn new(agent: Arc<NotebookChatAgent>, history: H) -> Self {
        let turns = match history.load() {
            Ok(turns) => turns,
            Err(e) => {
                error!("Failed to load history: {}", e);
                Vec::new()
            }
        };
        if !turns.is_empty() {
            info!("Seeding session with {} stored turns", turns.len());
            agent.seed_history(turns).await;
        }
        Self { agent, history }
    }

    pub fn agent(&self) -> &Arc<NotebookChatAgent> {
        &self.agent
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    /// Handle one decoded comm message
    pub async fn handle_message(&mut self, message: &Value) -> BridgeReply {
        let inbound: Inbound = match serde_json::from_value(message.clone()) {
            Ok(inbound) => inbound,
            Err(e) => {
                return BridgeReply::error(ErrorStatus::InternalError, Some(e.to_string()))
            }
        };
        debug!("Comm message: {}", inbound.kind);

        match inbound.kind.as_str() {
            "chat" => self.chat(inbound.content.as_deref().unwrap_or_default()).await,
            "load_history" => self.load_history(),
            "clear_history" => self.clear_history().await,
            other => {
                warn!("Unknown comm message type: {}", other);
                BridgeReply::error(ErrorStatus::UnknownMessageType, Some(other.to_string()))
            }
        }
    }

    async fn chat(&mut self, content: &str) -> BridgeReply {
        let content = content.trim();
        if content.is_empty() {
            return BridgeReply::error(ErrorStatus::EmptyMessage, None);
        }

        self.persist(Turn::user(content));
        let reply = self.agent.chat(content, true).await.into_string();
        let turn = Turn::assistant(reply.clone());
        let timestamp = turn.timestamp.to_rfc3339();
        self.persist(turn);

        BridgeReply::Response {
            content: reply,
            timestamp,
        }
    }

    fn load_history(&self) -> BridgeReply {
        let history = self.history.load().unwrap_or_else(|e| {
            error!("Failed to load history: {}", e);
            Vec::new()
        });
        BridgeReply::History { history }
    }

    async fn clear_history(&mut self) -> BridgeReply {
        if let Err(e) = self.history.clear() {
            error!("Failed to clear history: {}", e);
        }
        self.agent.clear_history().await;
        BridgeReply::Cleared
    }

    fn persist(&mut self, turn: Turn) {
        if let Err(e) = self.history.append(turn) {
            error!("Failed to save history: {}", e);
        }
    }

    /// Run the comm channel until `reader` reaches end of input
    pub async fn serve<R, W>(&mut self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        write_reply(&mut writer, &BridgeReply::Initialized).await?;

        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let reply = match serde_json::from_str::<Value>(line) {
                Ok(message) => self.handle_message(&message).await,
                Err(e) => {
                    warn!("Malformed comm message: {}", e);
                    BridgeReply::error(ErrorStatus::InternalError, Some(e.to_string()))
                }
            };
            write_reply(&mut writer, &reply).await?;
        }

        info!("Comm channel closed");
        Ok(())
    }
}

async fn write_reply<W: AsyncWrite + Unpin>(
    writer: &mut W,
    reply: &BridgeReply,
) -> std::io::Result<()> {
    let mut line = serde_json::to_string(reply)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}
