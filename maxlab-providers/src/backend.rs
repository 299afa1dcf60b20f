//! Backend adapters
//!
//! All three services speak the OpenAI chat-completions wire format; they
//! differ only in where the request goes and how it is authenticated. Each
//! adapter captures exactly that, and `ChatCompletionsClient` is generic
//! over it.

use maxlab_core::config::{AzureConfig, CopilotConfig, OpenAiConfig};
use reqwest::RequestBuilder;

use crate::base::{ProviderError, ProviderResult};

pub const OPENAI_DEFAULT_BASE: &str = "https://api.openai.com/v1";
pub const COPILOT_DEFAULT_BASE: &str = "https://api.githubcopilot.com";

/// Endpoint and authentication for one chat-completions service
pub trait Backend: Send + Sync + 'static {
    /// Short display name
    fn name(&self) -> &'static str;

    /// Full URL of the chat-completions endpoint
    fn endpoint(&self) -> String;

    /// Attach credentials and service-specific headers
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder;

    /// Model to request when the caller does not name one
    fn model(&self) -> &str;
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn trim_base(base: &str) -> String {
    base.trim_end_matches('/').to_string()
}

/// api.openai.com (or any OpenAI-compatible base URL)
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    api_key: String,
    api_base: String,
    model: String,
}

impl OpenAiBackend {
    pub fn new(api_key: impl Into<String>, api_base: Option<&str>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: trim_base(non_empty(api_base).unwrap_or(OPENAI_DEFAULT_BASE)),
            model: model.into(),
        }
    }

    /// Build from config; `fallback_model` is used when the config names none
    pub fn from_config(config: &OpenAiConfig, fallback_model: &str) -> ProviderResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ProviderError::ConfigError(
                "OpenAI API key not provided. Set OPENAI_API_KEY or backend.openai.api_key."
                    .to_string(),
            ));
        }
        let model = non_empty(config.model.as_deref()).unwrap_or(fallback_model);
        Ok(Self::new(
            config.api_key.clone(),
            config.api_base.as_deref(),
            model,
        ))
    }
}

impl Backend for OpenAiBackend {
    fn name(&self) -> &'static str {
        "OpenAI"
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.api_key)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Azure OpenAI deployment
#[derive(Debug, Clone)]
pub struct AzureBackend {
    endpoint: String,
    api_key: String,
    deployment: String,
    api_version: String,
}

impl AzureBackend {
    pub fn from_config(config: &AzureConfig) -> ProviderResult<Self> {
        let missing = config.missing();
        if !missing.is_empty() {
            return Err(ProviderError::ConfigError(format!(
                "Azure OpenAI configuration missing: {}",
                missing.join(", ")
            )));
        }
        Ok(Self {
            endpoint: trim_base(config.endpoint.trim()),
            api_key: config.api_key.clone(),
            deployment: config.deployment.clone(),
            api_version: config.api_version.clone(),
        })
    }

    pub fn deployment(&self) -> &str {
        &self.deployment
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }
}

impl Backend for AzureBackend {
    fn name(&self) -> &'static str {
        "Azure OpenAI"
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("api-key", &self.api_key)
    }

    /// Azure routes by deployment; the deployment name doubles as the model id
    fn model(&self) -> &str {
        &self.deployment
    }
}

/// GitHub Copilot chat API
#[derive(Debug, Clone)]
pub struct CopilotBackend {
    token: String,
    api_base: String,
    model: String,
}

impl CopilotBackend {
    pub fn from_config(config: &CopilotConfig, model: &str) -> ProviderResult<Self> {
        if config.token.trim().is_empty() {
            return Err(ProviderError::ConfigError(
                "GitHub Copilot PAT not provided. Set GITHUB_COPILOT_PAT or backend.copilot.token."
                    .to_string(),
            ));
        }
        Ok(Self {
            token: config.token.clone(),
            api_base: trim_base(
                non_empty(config.api_base.as_deref()).unwrap_or(COPILOT_DEFAULT_BASE),
            ),
            model: model.to_string(),
        })
    }
}

impl Backend for CopilotBackend {
    fn name(&self) -> &'static str {
        "GitHub Copilot"
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header("Copilot-Integration-Id", "maxlab")
            .header("Editor-Version", concat!("maxlab/", env!("CARGO_PKG_VERSION")))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_requires_key() {
        let err = OpenAiBackend::from_config(&OpenAiConfig::default(), "gpt-4o").unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_openai_endpoint_and_model_override() {
        let config = OpenAiConfig {
            api_key: "sk-test".to_string(),
            api_base: Some("http://localhost:8080/v1/".to_string()),
            model: Some("gpt-4.1".to_string()),
        };
        let backend = OpenAiBackend::from_config(&config, "gpt-4o").unwrap();
        assert_eq!(backend.endpoint(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(backend.model(), "gpt-4.1");

        let defaulted = OpenAiBackend::new("sk-test", Some("  "), "gpt-4o");
        assert_eq!(defaulted.endpoint(), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn test_azure_lists_every_missing_value() {
        let err = AzureBackend::from_config(&AzureConfig::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: Azure OpenAI configuration missing: \
             AZURE_OPENAI_ENDPOINT, AZURE_OPENAI_API_KEY, AZURE_OPENAI_DEPLOYMENT_NAME"
        );
    }

    #[test]
    fn test_azure_endpoint_shape() {
        let config = AzureConfig {
            endpoint: "https://contoso.openai.azure.com/".to_string(),
            api_key: "azure-key".to_string(),
            deployment: "gpt4o-prod".to_string(),
            ..Default::default()
        };
        let backend = AzureBackend::from_config(&config).unwrap();
        assert_eq!(
            backend.endpoint(),
            "https://contoso.openai.azure.com/openai/deployments/gpt4o-prod/chat/completions?api-version=2024-02-15-preview"
        );
        assert_eq!(backend.model(), "gpt4o-prod");
    }

    #[test]
    fn test_copilot_requires_token() {
        let err = CopilotBackend::from_config(&CopilotConfig::default(), "gpt-4o").unwrap_err();
        assert!(err.to_string().contains("GITHUB_COPILOT_PAT"));

        let config = CopilotConfig {
            token: "ghp_x".to_string(),
            api_base: None,
        };
        let backend = CopilotBackend::from_config(&config, "gpt-4o").unwrap();
        assert_eq!(backend.endpoint(), "https://api.githubcopilot.com/chat/completions");
    }
}
