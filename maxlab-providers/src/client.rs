//! Chat-completions HTTP client

use async_trait::async_trait;
use eventsource_stream::{EventStreamError, Eventsource};
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use maxlab_core::config::{BackendKind, BackendSettings};

use crate::backend::{AzureBackend, Backend, CopilotBackend, OpenAiBackend};
use crate::base::{
    parse_arguments, LLMProvider, LLMResponse, LLMStreamEvent, Message, ProviderError,
    ProviderEventStream, ProviderResult, ToolCallRequest,
};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    max_tokens: i32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCallRequest>,
}

#[derive(Debug, Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: i64,
    #[serde(default)]
    completion_tokens: i64,
    #[serde(default)]
    total_tokens: i64,
}

impl Usage {
    fn into_map(self) -> HashMap<String, i64> {
        HashMap::from([
            ("prompt_tokens".to_string(), self.prompt_tokens),
            ("completion_tokens".to_string(), self.completion_tokens),
            ("total_tokens".to_string(), self.total_tokens),
        ])
    }
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<StreamToolCall>,
}

#[derive(Debug, Deserialize)]
struct StreamToolCall {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<StreamFunction>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug, Default, Clone)]
struct PartialToolCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

/// Accumulates streamed deltas into the final response
#[derive(Debug, Default)]
struct StreamState {
    content: String,
    finish_reason: Option<String>,
    usage: Option<Usage>,
    partial_calls: Vec<PartialToolCall>,
    saw_chunk: bool,
}

impl StreamState {
    /// Fold one chunk in, returning the events it produces
    fn apply(&mut self, chunk: StreamChunk) -> Vec<LLMStreamEvent> {
        self.saw_chunk = true;
        if let Some(usage) = chunk.usage {
            self.usage = Some(usage);
        }
        let Some(choice) = chunk.choices.into_iter().next() else {
            return Vec::new();
        };

        let mut events = Vec::new();
        if let Some(reason) = choice.finish_reason {
            self.finish_reason = Some(reason);
        }
        if let Some(text) = choice.delta.content {
            if !text.is_empty() {
                self.content.push_str(&text);
                events.push(LLMStreamEvent::TextDelta(text));
            }
        }
        for call in choice.delta.tool_calls {
            let index = call.index;
            if self.partial_calls.len() <= index {
                self.partial_calls
                    .resize_with(index + 1, PartialToolCall::default);
            }
            let entry = &mut self.partial_calls[index];
            if let Some(id) = call.id {
                entry.id = Some(id);
            }
            let Some(function) = call.function else {
                continue;
            };
            if let Some(name) = function.name {
                entry.name.push_str(&name);
            }
            if let Some(delta) = function.arguments {
                entry.arguments.push_str(&delta);
                events.push(LLMStreamEvent::ToolCallDelta {
                    index,
                    id: entry.id.clone(),
                    name: (!entry.name.is_empty()).then(|| entry.name.clone()),
                    arguments_delta: Some(delta),
                });
            }
        }
        events
    }

    fn finish(self) -> LLMResponse {
        let tool_calls = self
            .partial_calls
            .into_iter()
            .enumerate()
            .map(|(i, call)| ToolCallRequest {
                id: call.id.unwrap_or_else(|| format!("stream_tool_call_{}", i)),
                call_type: "function".to_string(),
                name: call.name,
                arguments: parse_arguments(serde_json::Value::String(call.arguments)),
            })
            .collect();

        LLMResponse {
            content: (!self.content.is_empty()).then_some(self.content),
            tool_calls,
            finish_reason: self.finish_reason.unwrap_or_else(|| "stop".to_string()),
            usage: self.usage.map(Usage::into_map).unwrap_or_default(),
        }
    }
}

/// OpenAI-compatible chat-completions client, parameterized by the service
/// it talks to
pub struct ChatCompletionsClient<B: Backend> {
    client: Client,
    backend: B,
}

impl<B: Backend> ChatCompletionsClient<B> {
    pub fn new(backend: B) -> Self {
        Self {
            client: Client::new(),
            backend,
        }
    }

    /// Create a client whose HTTP requests give up after `timeout`
    pub fn with_timeout(backend: B, timeout: Duration) -> ProviderResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, backend })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn build_request(
        &self,
        messages: Vec<Message>,
        tools: Option<Vec<serde_json::Value>>,
        model: Option<String>,
        max_tokens: i32,
        temperature: f64,
        stream: bool,
    ) -> ChatCompletionRequest {
        let tool_choice = tools.as_ref().map(|_| "auto".to_string());
        ChatCompletionRequest {
            model: model.unwrap_or_else(|| self.backend.model().to_string()),
            messages,
            tools,
            tool_choice,
            stream: stream.then_some(true),
            max_tokens,
            temperature,
        }
    }

    async fn post(&self, request: &ChatCompletionRequest) -> ProviderResult<reqwest::Response> {
        debug!(
            "Sending {}chat request to {} with model {}",
            if request.stream.is_some() { "streaming " } else { "" },
            self.backend.name(),
            request.model
        );

        let builder = self.client.post(self.backend.endpoint()).json(request);
        let response = self.backend.authorize(builder).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::ApiError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }
        Ok(response)
    }

    fn parse_response(response: ChatCompletionResponse) -> ProviderResult<LLMResponse> {
        let usage = response.usage.into_map();
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".to_string()))?;

        Ok(LLMResponse {
            content: choice.message.content,
            tool_calls: choice.message.tool_calls,
            finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".to_string()),
            usage,
        })
    }
}

#[async_trait]
impl<B: Backend> LLMProvider for ChatCompletionsClient<B> {
    async fn chat(
        &self,
        messages: Vec<Message>,
        tools: Option<Vec<serde_json::Value>>,
        model: Option<String>,
        max_tokens: i32,
        temperature: f64,
    ) -> ProviderResult<LLMResponse> {
        let request = self.build_request(messages, tools, model, max_tokens, temperature, false);
        let response = self.post(&request).await?;
        let data: ChatCompletionResponse = response.json().await?;
        Self::parse_response(data)
    }

    async fn chat_stream(
        &self,
        messages: Vec<Message>,
        tools: Option<Vec<serde_json::Value>>,
        model: Option<String>,
        max_tokens: i32,
        temperature: f64,
    ) -> ProviderResult<ProviderEventStream> {
        let request = self.build_request(messages, tools, model, max_tokens, temperature, true);
        let response = self.post(&request).await?;

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut events = response.bytes_stream().eventsource();
            let mut state = StreamState::default();

            while let Some(event) = events.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        let _ = tx.send(Err(stream_error(err)));
                        return;
                    }
                };
                let payload = event.data.trim();
                if payload.is_empty() {
                    continue;
                }
                if payload == "[DONE]" {
                    let _ = tx.send(Ok(LLMStreamEvent::Completed(state.finish())));
                    return;
                }
                let parsed = match serde_json::from_str::<StreamChunk>(payload) {
                    Ok(chunk) => chunk,
                    Err(err) => {
                        let _ = tx.send(Err(ProviderError::JsonError(err)));
                        return;
                    }
                };
                for delta in state.apply(parsed) {
                    let _ = tx.send(Ok(delta));
                }
            }

            if state.saw_chunk {
                warn!("Stream closed without [DONE]; finishing with what arrived");
                let _ = tx.send(Ok(LLMStreamEvent::Completed(state.finish())));
            } else {
                let _ = tx.send(Err(ProviderError::Incomplete));
            }
        });

        Ok(Box::pin(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })))
    }

    fn get_default_model(&self) -> String {
        self.backend.model().to_string()
    }
}

fn stream_error(err: EventStreamError<reqwest::Error>) -> ProviderError {
    match err {
        EventStreamError::Transport(err) => ProviderError::HttpError(err),
        other => ProviderError::InvalidResponse(format!("Malformed event stream: {}", other)),
    }
}

/// Build the provider selected by `settings`, failing fast when its
/// credentials are missing
pub fn from_settings(
    settings: &BackendSettings,
    model: &str,
    timeout: Duration,
) -> ProviderResult<Arc<dyn LLMProvider>> {
    let provider: Arc<dyn LLMProvider> = match settings.resolved_kind() {
        BackendKind::Azure => Arc::new(ChatCompletionsClient::with_timeout(
            AzureBackend::from_config(&settings.azure)?,
            timeout,
        )?),
        BackendKind::Copilot => Arc::new(ChatCompletionsClient::with_timeout(
            CopilotBackend::from_config(&settings.copilot, model)?,
            timeout,
        )?),
        BackendKind::OpenAi | BackendKind::Auto => Arc::new(ChatCompletionsClient::with_timeout(
            OpenAiBackend::from_config(&settings.openai, model)?,
            timeout,
        )?),
    };
    debug!("Using model {}", provider.get_default_model());
    Ok(provider)
}
