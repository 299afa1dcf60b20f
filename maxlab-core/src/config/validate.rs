//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
///
/// Credentials are not checked here; a missing key is reported when the
/// backend client is built.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.agent.model.trim().is_empty() {
        errors.push("agent.model must not be empty".to_string());
    }
    if config.agent.timeout_secs == 0 {
        errors.push("agent.timeout_secs must be > 0".to_string());
    }
    if config.agent.max_tokens == 0 {
        errors.push("agent.max_tokens must be > 0".to_string());
    }
    if !(0.0..=2.0).contains(&config.agent.temperature) {
        errors.push("agent.temperature must be in [0.0, 2.0]".to_string());
    }
    if config.agent.max_tool_iterations == 0 {
        errors.push("agent.max_tool_iterations must be > 0".to_string());
    }
    if let Some(prompt) = &config.agent.system_prompt {
        if prompt.trim().is_empty() {
            errors.push("agent.system_prompt must not be blank when set".to_string());
        }
    }

    if config.history.file.trim().is_empty() {
        errors.push("history.file must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_defaults() {
        validate_config(&Config::default()).unwrap();
    }

    #[test]
    fn test_validate_aggregates_errors() {
        let mut config = Config::default();
        config.agent.temperature = 3.0;
        config.agent.max_tokens = 0;

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("agent.temperature"));
        assert!(err.contains("agent.max_tokens"));
    }

    #[test]
    fn test_validate_rejects_blank_prompt_override() {
        let mut config = Config::default();
        config.agent.system_prompt = Some("   ".to_string());

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("agent.system_prompt"));
    }
}
