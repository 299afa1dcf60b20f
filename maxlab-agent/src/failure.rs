//! Send failures and their display text

use std::time::Duration;
use thiserror::Error;

/// Why a send produced no reply
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// No terminal signal arrived within the allowed time
    #[error("request timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    /// The backend reported an error
    #[error("upstream error: {0}")]
    Upstream(String),
}

/// Broad category of an upstream failure, picked by substring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    Quota,
    Auth,
    RateLimit,
    Service,
}

impl FailureCategory {
    /// Categories are checked in a fixed order; the first match wins
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if message.contains("insufficient_quota") || message.contains("429") {
            Self::Quota
        } else if lower.contains("authentication") || lower.contains("invalid") {
            Self::Auth
        } else if lower.contains("rate_limit") {
            Self::RateLimit
        } else {
            Self::Service
        }
    }
}

impl SendError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SendError::TimedOut(_))
    }

    /// Display-safe Markdown for the caller
    pub fn render(&self) -> String {
        match self {
            SendError::TimedOut(_) => {
                "❌ **Request timed out**\n\nThe agent took too long to respond.".to_string()
            }
            SendError::Upstream(message) => render_upstream(message),
        }
    }
}

fn render_upstream(message: &str) -> String {
    match FailureCategory::classify(message) {
        FailureCategory::Quota => concat!(
            "❌ **API Quota Exceeded**\n\n",
            "Your API account has no remaining balance or quota.\n\n",
            "**To fix:**\n",
            "1. Visit https://platform.openai.com/account/billing/overview\n",
            "2. Add a payment method or credit\n",
            "3. Update `OPENAI_API_KEY` in `.env` if using a different account\n",
        )
        .to_string(),
        FailureCategory::Auth => concat!(
            "❌ **Invalid API Key or Authentication Failed**\n\n",
            "The API key in `.env` is invalid or expired.\n\n",
            "**To fix:**\n",
            "1. Get a valid API key from https://platform.openai.com/api-keys\n",
            "2. Update `OPENAI_API_KEY` in `.env`\n",
            "3. Restart and try again\n",
        )
        .to_string(),
        FailureCategory::RateLimit => concat!(
            "❌ **Rate Limit Exceeded**\n\n",
            "Too many requests in a short time.\n\n",
            "**To fix:** Wait a few seconds and try again.\n",
        )
        .to_string(),
        FailureCategory::Service => format!(
            "❌ **Service Error**\n\n\
             The AI service encountered an issue:\n\n\
             ```\n{}\n```\n\n\
             Please check your API configuration and try again.\n",
            message
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_order() {
        // quota wins over auth even when both match
        assert_eq!(
            FailureCategory::classify("HTTP 429: invalid request, insufficient_quota"),
            FailureCategory::Quota
        );
        assert_eq!(
            FailureCategory::classify("HTTP 401: Invalid API key"),
            FailureCategory::Auth
        );
        assert_eq!(
            FailureCategory::classify("Authentication required"),
            FailureCategory::Auth
        );
        assert_eq!(
            FailureCategory::classify("code=RATE_LIMIT_exceeded"),
            FailureCategory::RateLimit
        );
        assert_eq!(
            FailureCategory::classify("connection reset"),
            FailureCategory::Service
        );
    }

    #[test]
    fn test_timeout_is_distinct() {
        let err = SendError::TimedOut(Duration::from_secs(60));
        assert!(err.is_timeout());
        assert!(!SendError::Upstream("timed out".into()).is_timeout());
        assert!(err.render().starts_with("❌ **Request timed out**"));
    }

    #[test]
    fn test_every_rendering_uses_the_same_glyph() {
        for message in ["429", "invalid key", "rate_limit", "boom"] {
            let text = SendError::Upstream(message.to_string()).render();
            assert!(text.starts_with("❌ **"), "{}", text);
        }
    }

    #[test]
    fn test_service_error_quotes_the_message() {
        let text = SendError::Upstream("HTTP 500: upstream exploded".into()).render();
        assert!(text.contains("```\nHTTP 500: upstream exploded\n```"));
    }
}
