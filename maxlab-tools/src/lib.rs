//! Plugin tools for MaxLab
//!
//! Tools are what the model may call during a chat turn. Each built-in
//! plugin contributes a handful of keyword-matching functions named
//! `{plugin}-{function}`.

pub mod base;
pub mod finance;
pub mod notebook;
pub mod plugin;
pub mod registry;

pub use base::{Tool, ToolError};
pub use finance::FinancePlugin;
pub use notebook::NotebookAnalyzerPlugin;
pub use plugin::{FunctionTool, Param, Plugin};
pub use registry::ToolRegistry;

use std::sync::Arc;

/// Every plugin that ships with MaxLab
pub fn builtin_plugins() -> Vec<Arc<dyn Plugin>> {
    vec![Arc::new(NotebookAnalyzerPlugin), Arc::new(FinancePlugin)]
}

/// Look up a built-in plugin by name
pub fn find_plugin(name: &str) -> Option<Arc<dyn Plugin>> {
    builtin_plugins().into_iter().find(|p| p.name() == name)
}
