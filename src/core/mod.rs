//! # Core Module
//!
//! Configuration and error handling for the nudge engine.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Typed `SchedulerError` surface replaces ad-hoc anyhow errors
//! - 1.0.0: Initial creation with config module

pub mod config;
pub mod error;

// Re-export commonly used items
pub use config::{format_interval, parse_interval, Config, SinkKind, DEFAULT_MESSAGE};
pub use error::SchedulerError;
