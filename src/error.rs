//! # Error Types
//!
//! Custom error types for Gauge Monitor using `thiserror`.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Gauge Monitor
#[derive(Debug, Error)]
pub enum GaugeMonitorError {
    /// The remote channel could not be established
    #[error("Connection error: {0}")]
    Connection(String),

    /// A remote command exited non-zero or could not be spawned
    #[error("Command `{command}` failed: {reason}")]
    Command { command: String, reason: String },

    /// Register output was not a valid 16-bit hexadecimal word
    #[error("Parse error: {0}")]
    Parse(String),

    /// Persisted time series missing or unreadable
    #[error("Failed to load {}: {}", path.display(), reason)]
    PersistenceLoad { path: PathBuf, reason: String },

    /// Final save of the time series failed
    #[error("Failed to save {}: {}", path.display(), reason)]
    PersistenceSave { path: PathBuf, reason: String },

    /// Chart drawing errors
    #[error("Render error: {0}")]
    Render(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A background task panicked or was cancelled
    #[error("Task error: {0}")]
    Task(String),
}

/// Result type alias for Gauge Monitor
pub type Result<T> = std::result::Result<T, GaugeMonitorError>;
