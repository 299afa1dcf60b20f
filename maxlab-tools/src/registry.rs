//! Tool registry

use super::base::Tool;
use super::plugin::Plugin;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Registry of available tools, kept in registration order
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create a new tool registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&i) => {
                warn!("Replacing tool {}", name);
                self.tools[i] = tool;
            }
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Register every function of a plugin
    pub fn register_plugin(&mut self, plugin: &dyn Plugin) {
        let functions = plugin.functions();
        debug!(
            "Registering plugin {} ({} functions)",
            plugin.name(),
            functions.len()
        );
        for function in functions {
            self.register(Arc::new(function));
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&i| self.tools[i].clone())
    }

    /// Check if a tool is registered
    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Get all tool definitions in OpenAI format
    pub fn get_definitions(&self) -> Vec<Value> {
        self.tools.iter().map(|tool| tool.to_schema()).collect()
    }

    /// Execute a tool by name. Failures come back as `Error: ...` text so
    /// the model can read them.
    pub async fn execute(&self, name: &str, params: Value) -> String {
        let Some(tool) = self.get(name) else {
            return format!("Error: Tool '{}' not found", name);
        };

        let errors = tool.validate_params(&params);
        if !errors.is_empty() {
            return format!(
                "Error: Invalid parameters for tool '{}': {}",
                name,
                errors.join("; ")
            );
        }

        match tool.execute(params).await {
            Ok(result) => result,
            Err(e) => format!("Error executing {}: {}", name, e),
        }
    }

    /// Get list of registered tool names
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    /// Get number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
