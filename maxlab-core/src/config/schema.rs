//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration for MaxLab
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Agent behaviour
    #[serde(default)]
    pub agent: AgentSettings,
    /// Backend selection and credentials
    #[serde(default)]
    pub backend: BackendSettings,
    /// Chat history persistence
    #[serde(default)]
    pub history: HistoryConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}

/// Assistant persona, which picks the default system prompt
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    /// Copilot-backed notebook assistant
    MaxBot,
    /// OpenAI / Azure OpenAI backed notebook assistant with plugins
    MaxLab,
}

/// Agent settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Model identifier requested from the backend
    #[serde(default = "default_model")]
    pub model: String,
    /// Override for the persona's default system prompt
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Persona; derived from the backend when unset
    #[serde(default)]
    pub persona: Option<Persona>,
    /// Seconds to wait for a reply before giving up
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum tokens per completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum tool-call rounds within one request
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: u32,
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tool_iterations() -> u32 {
    5
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            system_prompt: None,
            persona: None,
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_tool_iterations: default_max_tool_iterations(),
        }
    }
}

/// Which backend the agent talks to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Azure when fully configured, OpenAI otherwise
    #[default]
    Auto,
    OpenAi,
    Azure,
    Copilot,
}

/// Backend selection and per-backend credentials
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BackendSettings {
    #[serde(default)]
    pub kind: BackendKind,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub azure: AzureConfig,
    #[serde(default)]
    pub copilot: CopilotConfig,
}

impl BackendSettings {
    /// Resolve `Auto` to a concrete backend
    pub fn resolved_kind(&self) -> BackendKind {
        match self.kind {
            BackendKind::Auto if self.azure.is_complete() => BackendKind::Azure,
            BackendKind::Auto => BackendKind::OpenAi,
            other => other,
        }
    }
}

/// OpenAI credentials
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_base: Option<String>,
    /// Model override; falls back to `agent.model`
    #[serde(default)]
    pub model: Option<String>,
}

/// Azure OpenAI credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureConfig {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub deployment: String,
    #[serde(default = "default_azure_api_version")]
    pub api_version: String,
}

fn default_azure_api_version() -> String {
    "2024-02-15-preview".to_string()
}

impl AzureConfig {
    /// Names of the environment variables whose values are missing
    pub fn missing(&self) -> Vec<&'static str> {
        [
            ("AZURE_OPENAI_ENDPOINT", &self.endpoint),
            ("AZURE_OPENAI_API_KEY", &self.api_key),
            ("AZURE_OPENAI_DEPLOYMENT_NAME", &self.deployment),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            deployment: String::new(),
            api_version: default_azure_api_version(),
        }
    }
}

/// GitHub Copilot credentials
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CopilotConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub api_base: Option<String>,
}

/// Chat history persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// JSON file holding the ordered turn list
    #[serde(default = "default_history_file")]
    pub file: String,
}

fn default_history_file() -> String {
    ".maxlab/chat_history.json".to_string()
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            file: default_history_file(),
        }
    }
}
