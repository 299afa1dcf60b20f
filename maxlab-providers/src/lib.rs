//! Chat-completion backends for MaxLab
//!
//! One OpenAI-compatible client, parameterized by a [`Backend`] that knows
//! the endpoint and authentication of OpenAI, Azure OpenAI or GitHub Copilot.

pub mod backend;
pub mod base;
pub mod client;

pub use backend::{AzureBackend, Backend, CopilotBackend, OpenAiBackend};
pub use base::{
    parse_arguments, LLMProvider, LLMResponse, LLMStreamEvent, Message, ProviderError,
    ProviderEventStream, ProviderResult, ToolCallRequest,
};
pub use client::{from_settings, ChatCompletionsClient};
