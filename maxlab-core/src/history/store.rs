//! History data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who produced a turn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One role-tagged message with its timestamp
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    /// Message role
    pub role: Role,
    /// Message content
    pub content: String,
    /// Message timestamp (ISO-8601)
    #[serde(with = "iso8601")]
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a turn stamped with the current time
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// ISO-8601 timestamps. Naive timestamps (no offset) are read as UTC so
/// that files written by `datetime.utcnow().isoformat()` style producers load.
mod iso8601 {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|e| serde::de::Error::custom(format!("invalid timestamp '{}': {}", raw, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_json_shape() {
        let turn = Turn::user("Hello");
        let value = serde_json::to_value(&turn).unwrap();
        assert_eq!(value["role"], "user");
        assert_eq!(value["content"], "Hello");
        assert!(value["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_naive_timestamp_reads_as_utc() {
        let turn: Turn = serde_json::from_str(
            r#"{"role":"assistant","content":"Hi","timestamp":"2024-03-01T09:30:15.250000"}"#,
        )
        .unwrap();
        assert_eq!(turn.role, Role::Assistant);
        assert_eq!(turn.timestamp.to_rfc3339(), "2024-03-01T09:30:15.250+00:00");
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let result = serde_json::from_str::<Turn>(
            r#"{"role":"system","content":"x","timestamp":"2024-03-01T09:30:15Z"}"#,
        );
        assert!(result.is_err());
    }
}
