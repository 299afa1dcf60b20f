//! Plugins: named groups of synchronous tool functions
//!
//! A plugin contributes [`FunctionTool`]s whose exposed names are
//! `{plugin}-{function}`, the form the model sees in its tool list.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::base::{Result, Tool};

/// Handler for one plugin function
pub type Handler = fn(&Value) -> Result<String>;

/// One declared parameter of a plugin function
#[derive(Debug, Clone, Copy)]
pub struct Param {
    pub name: &'static str,
    pub kind: &'static str,
    pub description: &'static str,
    pub required: bool,
}

impl Param {
    pub const fn string(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: "string",
            description,
            required: true,
        }
    }

    /// Optional number; the handler supplies the default
    pub const fn number(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: "number",
            description,
            required: false,
        }
    }
}

/// A plugin function exposed as a tool
#[derive(Debug, Clone)]
pub struct FunctionTool {
    name: String,
    function: &'static str,
    description: &'static str,
    params: Vec<Param>,
    handler: Handler,
}

impl FunctionTool {
    pub fn new(
        plugin: &str,
        function: &'static str,
        description: &'static str,
        params: &[Param],
        handler: Handler,
    ) -> Self {
        Self {
            name: format!("{}-{}", plugin, function),
            function,
            description,
            params: params.to_vec(),
            handler,
        }
    }

    /// Function name without the plugin prefix
    pub fn function(&self) -> &str {
        self.function
    }

    /// Run the handler directly
    pub fn call(&self, args: &Value) -> Result<String> {
        (self.handler)(args)
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn parameters(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.params {
            properties.insert(
                param.name.to_string(),
                json!({"type": param.kind, "description": param.description}),
            );
        }
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    async fn execute(&self, args: Value) -> Result<String> {
        self.call(&args)
    }
}

/// A named set of tool functions
pub trait Plugin: Send + Sync {
    /// Plugin name, used as the tool-name prefix
    fn name(&self) -> &str;

    /// One-line summary
    fn description(&self) -> &str;

    /// The functions this plugin exposes
    fn functions(&self) -> Vec<FunctionTool>;
}
