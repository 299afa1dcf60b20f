//! Notebook chat agent

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

use maxlab_core::config::{AgentSettings, Config, Persona};
use maxlab_core::history::Turn;
use maxlab_providers::{from_settings, LLMProvider, ProviderError};
use maxlab_tools::{builtin_plugins, Plugin};

use crate::context;
use crate::format::{plain, strip_markdown, tag_as_markdown, Reply};
use crate::session::{ChatEntry, SessionConfig, SessionManager};

/// Errors raised while building an agent
#[derive(Debug, Error)]
pub enum AgentError {
    /// Missing or incomplete backend credentials
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The backend client could not be built
    #[error(transparent)]
    Provider(ProviderError),

    #[error(transparent)]
    Core(#[from] maxlab_core::Error),
}

impl From<ProviderError> for AgentError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::ConfigError(message) => AgentError::Configuration(message),
            other => AgentError::Provider(other),
        }
    }
}

/// Knobs the agent needs beyond the provider itself
#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub persona: Persona,
    pub system_prompt: Option<String>,
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_tool_iterations: u32,
}

impl AgentOptions {
    pub fn from_settings(settings: &AgentSettings, persona: Persona) -> Self {
        Self {
            persona,
            system_prompt: settings
                .system_prompt
                .clone()
                .filter(|p| !p.trim().is_empty()),
            timeout: Duration::from_secs(settings.timeout_secs),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            max_tool_iterations: settings.max_tool_iterations,
        }
    }
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self::from_settings(&AgentSettings::default(), Persona::MaxLab)
    }
}

/// Chat assistant for notebooks
pub struct NotebookChatAgent {
    session: SessionManager,
    persona: Persona,
    timeout: Duration,
    status: String,
    plugins: tokio::sync::Mutex<Vec<String>>,
}

impl NotebookChatAgent {
    pub fn new(provider: Arc<dyn LLMProvider>, options: AgentOptions) -> Self {
        let model = provider.get_default_model();
        let system_prompt = options
            .system_prompt
            .unwrap_or_else(|| context::system_prompt(options.persona));
        let config = SessionConfig {
            model: model.clone(),
            system_prompt,
            max_tokens: i32::try_from(options.max_tokens).unwrap_or(i32::MAX),
            temperature: f64::from(options.temperature),
            max_tool_iterations: options.max_tool_iterations,
        };
        info!(
            "NotebookChatAgent initialized as {} with model: {}",
            context::persona_name(options.persona),
            model
        );
        Self {
            session: SessionManager::new(provider, config),
            persona: options.persona,
            timeout: options.timeout,
            status: format!("- Model: `{}`", model),
            plugins: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    /// Build the agent the configuration describes. MaxLab gets the
    /// built-in plugins; MaxBot starts without tools.
    pub async fn from_config(config: &Config) -> Result<Self, AgentError> {
        let kind = config.backend.resolved_kind();
        let persona = config
            .agent
            .persona
            .unwrap_or_else(|| context::default_persona(kind));
        let timeout = Duration::from_secs(config.agent.timeout_secs);
        let provider = from_settings(&config.backend, &config.agent.model, timeout)?;

        let mut agent = Self::new(provider, AgentOptions::from_settings(&config.agent, persona));
        agent.status = context::backend_status(&config.backend, agent.model());

        if persona == Persona::MaxLab {
            for plugin in builtin_plugins() {
                agent.add_plugin(plugin.as_ref()).await;
            }
        }
        Ok(agent)
    }

    pub fn persona(&self) -> Persona {
        self.persona
    }

    pub fn model(&self) -> &str {
        &self.session.config().model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Register a plugin. Ignored with a warning once a conversation has
    /// started.
    pub async fn add_plugin(&self, plugin: &dyn Plugin) -> bool {
        let added = self.session.add_plugin(plugin).await;
        if added {
            let mut plugins = self.plugins.lock().await;
            if !plugins.iter().any(|p| p == plugin.name()) {
                plugins.push(plugin.name().to_string());
            }
        }
        added
    }

    pub async fn plugin_names(&self) -> Vec<String> {
        self.plugins.lock().await.clone()
    }

    /// Markdown banner describing the persona, backend and plugins
    pub async fn status_banner(&self) -> String {
        context::ready_banner(self.persona, &self.status, &self.plugin_names().await)
    }

    /// Send a message and return the reply. Failures come back as
    /// display-safe text rather than errors.
    pub async fn chat(&self, message: &str, as_markdown: bool) -> Reply {
        debug!("User message: {}", message);
        let text = match self.session.send(message, self.timeout).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Chat request failed: {}", e);
                e.render()
            }
        };

        if as_markdown {
            tag_as_markdown(text)
        } else {
            plain(strip_markdown(&text))
        }
    }

    pub async fn analyze_code(&self, code: &str, context: Option<&str>) -> Reply {
        self.chat(&context::analyze_code_prompt(code, context), true)
            .await
    }

    pub async fn suggest_notebook_improvements(&self, summary: &str) -> Reply {
        self.chat(&context::notebook_improvements_prompt(summary), true)
            .await
    }

    /// Replay stored turns into the next conversation
    pub async fn seed_history(&self, turns: Vec<Turn>) {
        self.session.seed_history(turns).await;
    }

    /// Start a fresh conversation
    pub async fn clear_history(&self) {
        self.session.clear().await;
        info!("Session destroyed - history cleared");
    }

    pub async fn get_messages(&self) -> Vec<ChatEntry> {
        self.session.messages().await
    }

    pub async fn session_id(&self) -> Option<String> {
        self.session.session_id().await
    }

    /// Release the session and the client
    pub async fn cleanup(&self) {
        self.session.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use maxlab_core::config::{BackendKind, BackendSettings, CopilotConfig, OpenAiConfig};
    use maxlab_providers::{LLMResponse, Message, ProviderResult};
    use maxlab_tools::FinancePlugin;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    struct Echo {
        replies: StdMutex<Vec<ProviderResult<String>>>,
        prompts: StdMutex<Vec<String>>,
    }

    impl Echo {
        fn new(replies: Vec<ProviderResult<String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: StdMutex::new(replies),
                prompts: StdMutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LLMProvider for Echo {
        async fn chat(
            &self,
            messages: Vec<Message>,
            _tools: Option<Vec<serde_json::Value>>,
            _model: Option<String>,
            _max_tokens: i32,
            _temperature: f64,
        ) -> ProviderResult<LLMResponse> {
            if let Some(last) = messages.last() {
                self.prompts.lock().unwrap().push(last.content.clone());
            }
            let content = self.replies.lock().unwrap().remove(0)?;
            Ok(LLMResponse {
                content: Some(content),
                tool_calls: Vec::new(),
                finish_reason: "stop".to_string(),
                usage: HashMap::new(),
            })
        }

        fn get_default_model(&self) -> String {
            "echo-1".to_string()
        }
    }

    #[tokio::test]
    async fn test_chat_markdown_and_plain() {
        let provider = Echo::new(vec![
            Ok("## Result\n**fine**".to_string()),
            Ok("## Result\n**fine**".to_string()),
        ]);
        let agent = NotebookChatAgent::new(provider, AgentOptions::default());

        let rich = agent.chat("check", true).await;
        assert!(rich.is_markdown());
        assert_eq!(rich, "## Result\n**fine**");

        let flat = agent.chat("check", false).await;
        assert!(!flat.is_markdown());
        assert_eq!(flat, "Result\nfine");
    }

    #[tokio::test]
    async fn test_chat_renders_failures() {
        let provider = Echo::new(vec![Err(ProviderError::ApiError(
            "HTTP 429: insufficient_quota".to_string(),
        ))]);
        let agent = NotebookChatAgent::new(provider, AgentOptions::default());
        let reply = agent.chat("hi", true).await;
        assert!(reply.starts_with("❌ **API Quota Exceeded**"));
    }

    #[tokio::test]
    async fn test_prompt_helpers_route_through_chat() {
        let provider = Echo::new(vec![Ok("a".into()), Ok("b".into())]);
        let agent = NotebookChatAgent::new(provider.clone(), AgentOptions::default());
        agent.analyze_code("df.head()", None).await;
        agent.suggest_notebook_improvements("two cells").await;

        let prompts = provider.prompts.lock().unwrap().clone();
        assert!(prompts[0].starts_with("Please analyze this Python code"));
        assert!(prompts[1].starts_with("Based on this notebook summary"));
        assert_eq!(agent.get_messages().await.len(), 4);
    }

    #[tokio::test]
    async fn test_custom_system_prompt_wins() {
        let options = AgentOptions {
            system_prompt: Some("Be terse.".to_string()),
            ..Default::default()
        };
        let agent = NotebookChatAgent::new(Echo::new(vec![]), options);
        assert_eq!(agent.session.config().system_prompt, "Be terse.");
    }

    #[tokio::test]
    async fn test_plugins_listed_once() {
        let agent = NotebookChatAgent::new(Echo::new(vec![]), AgentOptions::default());
        assert!(agent.add_plugin(&FinancePlugin).await);
        assert!(agent.add_plugin(&FinancePlugin).await);
        assert_eq!(agent.plugin_names().await, vec!["finance".to_string()]);
        assert!(agent
            .status_banner()
            .await
            .ends_with("Available plugins: `finance`"));
    }

    #[tokio::test]
    async fn test_from_config_requires_credentials() {
        let err = NotebookChatAgent::from_config(&Config::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AgentError::Configuration(ref m) if m.contains("OPENAI_API_KEY")));
    }

    #[test]
    fn test_only_credential_errors_are_configuration() {
        let err = AgentError::from(ProviderError::ConfigError("missing key".into()));
        assert!(matches!(err, AgentError::Configuration(_)));
        assert_eq!(err.to_string(), "Configuration error: missing key");

        let err = AgentError::from(ProviderError::InvalidResponse("bad builder".into()));
        assert!(matches!(err, AgentError::Provider(_)));
        assert_eq!(err.to_string(), "Invalid response: bad builder");
    }

    #[tokio::test]
    async fn test_from_config_picks_persona_and_plugins() {
        let mut config = Config::default();
        config.backend = BackendSettings {
            openai: OpenAiConfig {
                api_key: "sk-test".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let maxlab = NotebookChatAgent::from_config(&config).await.unwrap();
        assert_eq!(maxlab.persona(), Persona::MaxLab);
        assert_eq!(
            maxlab.plugin_names().await,
            vec!["notebook_analyzer".to_string(), "finance".to_string()]
        );

        config.backend.kind = BackendKind::Copilot;
        config.backend.copilot = CopilotConfig {
            token: "ghp_test".into(),
            api_base: None,
        };
        let maxbot = NotebookChatAgent::from_config(&config).await.unwrap();
        assert_eq!(maxbot.persona(), Persona::MaxBot);
        assert!(maxbot.plugin_names().await.is_empty());
        assert!(maxbot.status_banner().await.starts_with("**MaxBot Ready! 🤖**"));
    }
}
