//! Prompts and banners

use maxlab_core::config::{BackendKind, BackendSettings, Persona};

const MARKDOWN_GUIDANCE: &str = "**IMPORTANT**: Always format your responses using Markdown. Use: \
headers (#, ##, ###), **bold** and *italic*, `code` blocks, lists, and tables. \
Always explain your suggestions clearly and provide code examples when relevant.";

/// Persona for a backend when the configuration does not pick one
pub fn default_persona(kind: BackendKind) -> Persona {
    match kind {
        BackendKind::Copilot => Persona::MaxBot,
        _ => Persona::MaxLab,
    }
}

pub fn persona_name(persona: Persona) -> &'static str {
    match persona {
        Persona::MaxBot => "MaxBot",
        Persona::MaxLab => "MaxLab",
    }
}

/// Default system prompt of a persona
pub fn system_prompt(persona: Persona) -> String {
    let intro = match persona {
        Persona::MaxBot => {
            "You are MaxBot, an AI expert in financial analysis and data science. \
             You can analyze Python notebook code, understand conda environments, \
             suggest improvements for financial data processing, and help with transaction categorization. "
        }
        Persona::MaxLab => {
            "You are MaxLab Assistant, an AI expert in financial analysis and data science. \
             You can analyze Python notebook code, understand conda environments, \
             suggest improvements for financial data processing, and help with transaction categorization. \
             You have access to plugins for notebook analysis and financial data insights. "
        }
    };
    format!("{}\n\n{}", intro, MARKDOWN_GUIDANCE)
}

/// Prompt asking for a review of one notebook cell
pub fn analyze_code_prompt(code: &str, context: Option<&str>) -> String {
    let mut prompt = format!(
        "Please analyze this Python code from a notebook:\n\n```python\n{}\n```",
        code
    );
    if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
        prompt.push_str(&format!("\n\nContext: {}", context));
    }
    prompt.push_str(
        "\n\nProvide suggestions for:\n\
         1. Code efficiency and best practices\n\
         2. Potential issues or edge cases\n\
         3. Integration with pandas/numpy workflows\n\
         4. Performance optimizations",
    );
    prompt
}

/// Prompt asking for notebook-wide improvements
pub fn notebook_improvements_prompt(summary: &str) -> String {
    format!(
        "Based on this notebook summary, provide specific suggestions for improvement:\n\n\
         {}\n\n\
         Focus on:\n\
         1. Code organization and structure\n\
         2. Analysis methodology improvements\n\
         3. Visualization enhancements\n\
         4. Documentation and clarity",
        summary
    )
}

/// One-paragraph description of the configured backend
pub fn backend_status(settings: &BackendSettings, model: &str) -> String {
    match settings.resolved_kind() {
        BackendKind::Azure => format!(
            "🔷 **Azure OpenAI** configured\n- Deployment: `{}`\n- Endpoint: `{}`\n- API Version: `{}`",
            settings.azure.deployment, settings.azure.endpoint, settings.azure.api_version
        ),
        BackendKind::Copilot => format!("🐙 **GitHub Copilot** configured\n- Model: `{}`", model),
        BackendKind::OpenAi | BackendKind::Auto => {
            format!("🟢 **OpenAI** configured\n- Model: `{}`", model)
        }
    }
}

/// Banner shown once the agent is ready
pub fn ready_banner(persona: Persona, status: &str, plugins: &[String]) -> String {
    let plugins = if plugins.is_empty() {
        "none".to_string()
    } else {
        plugins
            .iter()
            .map(|p| format!("`{}`", p))
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "**{} Ready! 🤖**\n\n{}\n\nAvailable plugins: {}",
        persona_name(persona),
        status,
        plugins
    )
}

/// Banner shown when the agent cannot be built from the configuration
pub fn config_failure_banner(error: &str) -> String {
    format!(
        "❌ **MaxLab Setup Failed**\n\n\
         Missing required configuration:\n\n\
         ```\n{}\n```\n\n\
         **For Azure OpenAI**, set:\n\
         - `AZURE_OPENAI_ENDPOINT`\n\
         - `AZURE_OPENAI_API_KEY`\n\
         - `AZURE_OPENAI_DEPLOYMENT_NAME`\n\n\
         **For OpenAI**, set:\n\
         - `OPENAI_API_KEY`\n\
         - Optional: `OPENAI_CHAT_MODEL_ID` (default: `gpt-4o`)\n\n\
         **For GitHub Copilot**, set:\n\
         - `GITHUB_COPILOT_PAT`",
        error
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use maxlab_core::config::AzureConfig;

    #[test]
    fn test_personas() {
        assert_eq!(default_persona(BackendKind::Copilot), Persona::MaxBot);
        assert_eq!(default_persona(BackendKind::Azure), Persona::MaxLab);

        let maxbot = system_prompt(Persona::MaxBot);
        assert!(maxbot.starts_with("You are MaxBot"));
        assert!(!maxbot.contains("plugins"));
        assert!(system_prompt(Persona::MaxLab).contains("You have access to plugins"));
        assert!(maxbot.contains("\n\n**IMPORTANT**"));
    }

    #[test]
    fn test_analyze_code_prompt() {
        let prompt = analyze_code_prompt("df.head()", Some("data loading"));
        assert!(prompt.starts_with(
            "Please analyze this Python code from a notebook:\n\n```python\ndf.head()\n```\n\nContext: data loading"
        ));
        assert!(prompt.ends_with("4. Performance optimizations"));
        assert!(!analyze_code_prompt("x", None).contains("Context:"));
    }

    #[test]
    fn test_improvements_prompt() {
        let prompt = notebook_improvements_prompt("3 cells, loads bank CSVs");
        assert!(prompt.contains("\n\n3 cells, loads bank CSVs\n\nFocus on:"));
    }

    #[test]
    fn test_backend_status() {
        let settings = BackendSettings {
            azure: AzureConfig {
                endpoint: "https://x.openai.azure.com".into(),
                api_key: "k".into(),
                deployment: "prod".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let status = backend_status(&settings, "prod");
        assert!(status.starts_with("🔷 **Azure OpenAI** configured"));
        assert!(status.contains("- API Version: `2024-02-15-preview`"));

        let openai = backend_status(&BackendSettings::default(), "gpt-4o");
        assert_eq!(openai, "🟢 **OpenAI** configured\n- Model: `gpt-4o`");
    }

    #[test]
    fn test_ready_banner() {
        let banner = ready_banner(
            Persona::MaxLab,
            "status",
            &["notebook_analyzer".to_string(), "finance".to_string()],
        );
        assert_eq!(
            banner,
            "**MaxLab Ready! 🤖**\n\nstatus\n\nAvailable plugins: `notebook_analyzer`, `finance`"
        );
    }
}
