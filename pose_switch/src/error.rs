//! Error types for the gesture engine.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, PoseSwitchError>;

/// Errors that can occur while setting up or running the pipeline.
#[derive(Debug, Error)]
pub enum PoseSwitchError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Invalid landmark frame: expected {expected} values, got {actual}")]
    InvalidFrame { expected: usize, actual: usize },

    #[error("Frame acquisition failed: {0}")]
    Acquisition(String),

    #[error("Pose estimation failed: {0}")]
    Estimation(String),

    #[error("Giving up after {count} consecutive acquisition failures")]
    TooManyAcquisitionFailures { count: u32 },

    #[error("Actuator failed: {0}")]
    Actuator(String),

    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Malformed recording at line {line}: {message}")]
    Recording { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),
}

impl PoseSwitchError {
    pub fn acquisition(message: impl Into<String>) -> Self {
        Self::Acquisition(message.into())
    }

    pub fn estimation(message: impl Into<String>) -> Self {
        Self::Estimation(message.into())
    }

    pub fn initialization(message: impl Into<String>) -> Self {
        Self::Initialization(message.into())
    }

    /// Whether the error only affects the tick it happened in.
    pub fn is_per_tick(&self) -> bool {
        matches!(
            self,
            Self::Acquisition(_) | Self::Estimation(_) | Self::InvalidFrame { .. }
        )
    }
}
