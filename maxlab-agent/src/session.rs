//! Session lifecycle
//!
//! [`SessionManager`] owns at most one conversation with the backend. The
//! session is created lazily on the first send, destroyed on clear or
//! shutdown, and never reused once destroyed. Sends are serialized through
//! an async mutex and each one is bounded by a timeout.

use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use maxlab_core::history::{Role, Turn};
use maxlab_core::utils::preview;
use maxlab_providers::{LLMProvider, LLMResponse, LLMStreamEvent, Message, ProviderError};
use maxlab_tools::{Plugin, Tool, ToolRegistry};

use crate::failure::SendError;

/// Reply used when the backend finishes without producing any text
pub const NO_RESPONSE: &str = "No response received.";

/// Per-session request settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub model: String,
    pub system_prompt: String,
    pub max_tokens: i32,
    pub temperature: f64,
    pub max_tool_iterations: u32,
}

/// One role/content entry of the session transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatEntry {
    pub role: String,
    pub content: String,
}

/// The backend-side conversation context
#[derive(Debug)]
struct Session {
    id: String,
    transcript: Vec<Message>,
    tool_definitions: Vec<serde_json::Value>,
}

#[derive(Default)]
struct State {
    session: Option<Session>,
    tools: ToolRegistry,
    pending_seed: Vec<Turn>,
    shut_down: bool,
}

/// Owns the single live session of an agent
pub struct SessionManager {
    provider: Arc<dyn LLMProvider>,
    config: SessionConfig,
    state: Mutex<State>,
}

impl SessionManager {
    pub fn new(provider: Arc<dyn LLMProvider>, config: SessionConfig) -> Self {
        Self {
            provider,
            config,
            state: Mutex::new(State::default()),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Register a tool for the next session. Returns false (and logs a
    /// warning) once a session exists.
    pub async fn add_tool(&self, tool: Arc<dyn Tool>) -> bool {
        let mut state = self.state.lock().await;
        if state.session.is_some() {
            warn!(
                "Cannot add tool '{}' after the session is created; clear the session first",
                tool.name()
            );
            return false;
        }
        state.tools.register(tool);
        true
    }

    /// Register every function of a plugin; see [`Self::add_tool`]
    pub async fn add_plugin(&self, plugin: &dyn Plugin) -> bool {
        let mut state = self.state.lock().await;
        if state.session.is_some() {
            warn!(
                "Cannot add plugin '{}' after the session is created; clear the session first",
                plugin.name()
            );
            return false;
        }
        state.tools.register_plugin(plugin);
        info!("Plugin registered: {}", plugin.name());
        true
    }

    /// Names of the registered tools
    pub async fn tool_names(&self) -> Vec<String> {
        self.state.lock().await.tools.tool_names()
    }

    /// Turns to replay into the next session. Any live session is destroyed
    /// so the seed takes effect on the next send.
    pub async fn seed_history(&self, turns: Vec<Turn>) {
        let mut state = self.state.lock().await;
        if let Some(session) = state.session.take() {
            self.destroy(session).await;
        }
        debug!("Seeding next session with {} turns", turns.len());
        state.pending_seed = turns;
    }

    /// Create the session if absent and return its id
    pub async fn initialize(&self) -> Result<String, SendError> {
        let mut state = self.state.lock().await;
        let session = self.ensure_session(&mut state)?;
        Ok(session.id.clone())
    }

    /// Id of the live session, if any
    pub async fn session_id(&self) -> Option<String> {
        let state = self.state.lock().await;
        state.session.as_ref().map(|s| s.id.clone())
    }

    /// User and assistant entries of the live session's transcript
    pub async fn messages(&self) -> Vec<ChatEntry> {
        let state = self.state.lock().await;
        let Some(session) = state.session.as_ref() else {
            return Vec::new();
        };
        session
            .transcript
            .iter()
            .filter(|m| m.role == "user" || m.role == "assistant")
            .map(|m| ChatEntry {
                role: m.role.clone(),
                content: m.content.clone(),
            })
            .collect()
    }

    /// Send one message and wait up to `timeout` for the full reply
    pub async fn send(&self, message: &str, timeout: Duration) -> Result<String, SendError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        self.ensure_session(state)?;

        let State { session, tools, .. } = state;
        let Some(session) = session.as_mut() else {
            return Err(SendError::Upstream("session unavailable".to_string()));
        };

        debug!("Session {} sending: {}", session.id, preview(message, 80));

        let outcome = tokio::time::timeout(timeout, self.exchange(session, tools, message)).await;
        match outcome {
            Ok(Ok(reply)) => {
                session.transcript.push(Message::user(message));
                session.transcript.push(Message::assistant(reply.clone()));
                debug!("Session {} reply: {}", session.id, preview(&reply, 120));
                Ok(reply)
            }
            Ok(Err(err)) => {
                warn!("Session {} send failed: {}", session.id, err);
                Err(err)
            }
            Err(_) => {
                warn!("Session {} timed out after {:?}", session.id, timeout);
                Err(SendError::TimedOut(timeout))
            }
        }
    }

    /// Destroy the current session and drop any pending seed
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.pending_seed.clear();
        if let Some(session) = state.session.take() {
            self.destroy(session).await;
        }
        info!("Session cleared");
    }

    /// Destroy the session and release the client. Both steps run even if
    /// the other fails; failures are only logged.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        state.pending_seed.clear();
        if let Some(session) = state.session.take() {
            self.destroy(session).await;
        }
        if !state.shut_down {
            state.shut_down = true;
            match self.provider.shutdown().await {
                Ok(()) => info!("Client stopped"),
                Err(e) => error!("Failed to stop client: {}", e),
            }
        }
    }

    fn ensure_session<'a>(&self, state: &'a mut State) -> Result<&'a mut Session, SendError> {
        if state.shut_down {
            return Err(SendError::Upstream("agent has been shut down".to_string()));
        }
        if state.session.is_none() {
            let mut transcript = vec![Message::system(self.config.system_prompt.clone())];
            for turn in state.pending_seed.drain(..) {
                transcript.push(match turn.role {
                    Role::User => Message::user(turn.content),
                    Role::Assistant => Message::assistant(turn.content),
                });
            }
            let session = Session {
                id: Uuid::new_v4().to_string(),
                transcript,
                tool_definitions: state.tools.get_definitions(),
            };
            info!(
                "Session {} created with model {} ({} seeded messages, {} tools)",
                session.id,
                self.config.model,
                session.transcript.len() - 1,
                session.tool_definitions.len()
            );
            state.session = Some(session);
        }
        state
            .session
            .as_mut()
            .ok_or_else(|| SendError::Upstream("session unavailable".to_string()))
    }

    async fn destroy(&self, session: Session) {
        match self.provider.end_session(&session.id).await {
            Ok(()) => debug!("Session {} destroyed", session.id),
            Err(e) => warn!("Failed to destroy session {}: {}", session.id, e),
        }
    }

    /// One logical call: stream a completion, run any requested tools and
    /// repeat until the model answers without tool calls
    async fn exchange(
        &self,
        session: &Session,
        tools: &ToolRegistry,
        message: &str,
    ) -> Result<String, SendError> {
        let mut messages = session.transcript.clone();
        messages.push(Message::user(message));
        let tool_definitions =
            (!session.tool_definitions.is_empty()).then(|| session.tool_definitions.clone());

        let mut fragments = String::new();
        for iteration in 1..=self.config.max_tool_iterations {
            debug!(
                "Session {} round {}/{}",
                session.id, iteration, self.config.max_tool_iterations
            );
            let response = self
                .stream_round(messages.clone(), tool_definitions.clone(), &mut fragments)
                .await?;

            if !response.has_tool_calls() {
                break;
            }
            if iteration == self.config.max_tool_iterations {
                warn!(
                    "Session {} reached {} tool rounds; returning what arrived",
                    session.id, iteration
                );
                break;
            }

            info!("LLM requested {} tool calls", response.tool_calls.len());
            messages.push(Message::assistant_with_calls(
                response.content.clone().unwrap_or_default(),
                response.tool_calls.clone(),
            ));
            for call in &response.tool_calls {
                let args = serde_json::to_value(&call.arguments)
                    .unwrap_or_else(|_| serde_json::Value::Object(Default::default()));
                info!("Tool call: {}({})", call.name, preview(&args.to_string(), 200));
                let result = tools.execute(&call.name, args).await;
                messages.push(Message::tool(result, call.id.clone()));
            }
        }

        if fragments.is_empty() {
            Ok(NO_RESPONSE.to_string())
        } else {
            Ok(fragments)
        }
    }

    async fn stream_round(
        &self,
        messages: Vec<Message>,
        tools: Option<Vec<serde_json::Value>>,
        fragments: &mut String,
    ) -> Result<LLMResponse, SendError> {
        let mut stream = self
            .provider
            .chat_stream(
                messages,
                tools,
                Some(self.config.model.clone()),
                self.config.max_tokens,
                self.config.temperature,
            )
            .await
            .map_err(upstream)?;

        while let Some(event) = stream.next().await {
            match event.map_err(upstream)? {
                LLMStreamEvent::TextDelta(text) => fragments.push_str(&text),
                LLMStreamEvent::ToolCallDelta { .. } => {}
                LLMStreamEvent::Completed(response) => return Ok(response),
            }
        }
        Err(upstream(ProviderError::Incomplete))
    }
}

fn upstream(err: ProviderError) -> SendError {
    SendError::Upstream(err.to_string())
}
