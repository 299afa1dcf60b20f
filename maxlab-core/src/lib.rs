//! Core types and utilities for MaxLab
//!
//! This crate provides the configuration schema and loader, logging setup,
//! conversation history persistence and the shared error type used by the
//! other MaxLab crates.

pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod utils;

pub use error::{Error, Result};
