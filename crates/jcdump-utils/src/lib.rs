//! # jcdump Utilities
//!
//! Shared logging and configuration for the jcdump workspace.
//!
//! The core library only emits `tracing` events; this crate decides where
//! they go and reads the handful of environment settings the CLI honours.

pub mod config;
pub mod logging;

pub use config::{ConfigError, Settings};
// Re-export commonly used logging functions for convenience
pub use logging::{init_logging, init_logging_with_level, LogFormat, LogLevel, LoggingError};
pub use tracing::{debug, error, info, trace, warn};
