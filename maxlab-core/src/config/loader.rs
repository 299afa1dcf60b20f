//! Configuration loading and management

use super::schema::Config;
use super::validate::validate_config;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Configuration loader
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Create a new config loader with the default config directory
    pub fn new() -> Self {
        let config_dir = dirs::home_dir()
            .map(|h| h.join(".maxlab"))
            .unwrap_or_else(|| PathBuf::from(".maxlab"));

        Self { config_dir }
    }

    /// Create a new config loader with a custom config directory
    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            config_dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Load configuration from file and environment
    pub fn load(&self) -> crate::Result<Config> {
        let config_path = self.config_dir.join("config.json");
        let mut merged = serde_json::to_value(Config::default())?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let file_value: Value = serde_json::from_str(&content).map_err(|e| {
                crate::Error::Config(format!("{}: {}", config_path.display(), e))
            })?;
            overlay(&mut merged, file_value);
        }

        apply_alias_overrides(&mut merged);
        apply_path_overrides(&mut merged);

        let config: Config = serde_json::from_value(merged)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Credential variables the hosted notebook environment exports, mapped to
/// their place in the config tree
const ENV_ALIASES: &[(&str, &[&str])] = &[
    ("OPENAI_API_KEY", &["backend", "openai", "api_key"]),
    ("OPENAI_API_BASE", &["backend", "openai", "api_base"]),
    ("OPENAI_CHAT_MODEL_ID", &["backend", "openai", "model"]),
    ("AZURE_OPENAI_ENDPOINT", &["backend", "azure", "endpoint"]),
    ("AZURE_OPENAI_API_KEY", &["backend", "azure", "api_key"]),
    ("AZURE_OPENAI_DEPLOYMENT_NAME", &["backend", "azure", "deployment"]),
    ("AZURE_OPENAI_API_VERSION", &["backend", "azure", "api_version"]),
    ("GITHUB_COPILOT_PAT", &["backend", "copilot", "token"]),
];

const PATH_PREFIX: &str = "MAXLAB__";

/// Deep-merge `patch` into `base`; objects merge key by key, anything else
/// replaces
fn overlay(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(slot) => overlay(slot, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Place `value` at `path`, creating (or replacing non-object) parents
fn assign<S: AsRef<str>>(root: &mut Value, path: &[S], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        *root = value;
        return;
    };
    if !root.is_object() {
        *root = Value::Object(Map::new());
    }
    if let Value::Object(map) = root {
        let child = map
            .entry(head.as_ref().to_string())
            .or_insert(Value::Null);
        assign(child, rest, value);
    }
}

/// Env values are read as JSON when they parse (numbers, booleans,
/// quoted strings), otherwise as raw strings. A slot that already holds a
/// string always takes the raw text.
fn env_value(current: Option<&Value>, raw: &str) -> Value {
    if matches!(current, Some(Value::String(_))) {
        return Value::String(raw.to_string());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn lookup<'a, S: AsRef<str>>(root: &'a Value, path: &[S]) -> Option<&'a Value> {
    path.iter()
        .try_fold(root, |node, segment| node.get(segment.as_ref()))
}

fn apply_alias_overrides(config: &mut Value) {
    for (var, path) in ENV_ALIASES {
        match std::env::var(var) {
            Ok(value) if !value.trim().is_empty() => {
                assign(config, *path, Value::String(value));
            }
            _ => {}
        }
    }
}

fn apply_path_overrides(config: &mut Value) {
    for (key, raw) in std::env::vars() {
        let Some(suffix) = key.strip_prefix(PATH_PREFIX) else {
            continue;
        };
        let path: Vec<String> = suffix
            .split("__")
            .filter(|segment| !segment.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();
        if !path.is_empty() {
            let value = env_value(lookup(config, &path), &raw);
            assign(config, &path, value);
        }
    }
}
