//! Base trait for tools

use async_trait::async_trait;
use serde_json::Value;

/// A function the model may call
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name
    fn name(&self) -> &str;

    /// Get the tool description
    fn description(&self) -> &str;

    /// Get the tool parameters schema (JSON Schema format)
    fn parameters(&self) -> Value;

    /// Execute the tool with arguments
    async fn execute(&self, args: Value) -> Result<String>;

    /// Check `params` against the schema's `required` list and declared
    /// primitive types
    fn validate_params(&self, params: &Value) -> Vec<String> {
        let Some(params_obj) = params.as_object() else {
            return vec!["Parameters must be an object".to_string()];
        };
        let schema = self.parameters();
        let mut errors = Vec::new();

        if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
            for field_name in required.iter().filter_map(|f| f.as_str()) {
                if !params_obj.contains_key(field_name) {
                    errors.push(format!("Missing required field: {}", field_name));
                }
            }
        }

        if let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) {
            for (key, value) in params_obj {
                let expected = properties
                    .get(key)
                    .and_then(|p| p.get("type"))
                    .and_then(|t| t.as_str());
                let ok = match expected {
                    Some("string") => value.is_string(),
                    Some("number") => value.is_number() || numeric_string(value),
                    _ => true,
                };
                if !ok {
                    errors.push(format!(
                        "Field '{}' should be a {}",
                        key,
                        expected.unwrap_or_default()
                    ));
                }
            }
        }

        errors
    }

    /// Convert tool to OpenAI function schema format
    fn to_schema(&self) -> Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name(),
                "description": self.description(),
                "parameters": self.parameters(),
            }
        })
    }
}

fn numeric_string(value: &Value) -> bool {
    value
        .as_str()
        .map(|s| s.trim().parse::<f64>().is_ok())
        .unwrap_or(false)
}

/// Required string argument
pub fn str_arg<'a>(args: &'a Value, name: &str) -> Result<&'a str> {
    args.get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::InvalidArguments(format!("'{}' must be a string", name)))
}

/// Optional numeric argument; models sometimes send numbers as strings
pub fn f64_arg(args: &Value, name: &str, default: f64) -> Result<f64> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| ToolError::InvalidArguments(format!("'{}' is out of range", name))),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| ToolError::InvalidArguments(format!("'{}' must be a number", name))),
        Some(_) => Err(ToolError::InvalidArguments(format!(
            "'{}' must be a number",
            name
        ))),
    }
}

/// Tool errors
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

pub type Result<T> = std::result::Result<T, ToolError>;
