//! Core error types for behavior-scheduler-core.
//!
//! Every request the engine accepts either succeeds or fails with one of the
//! variants below. None of them is fatal: a rejected request leaves the task
//! list, the history and the model exactly as they were.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for behavior-scheduler-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Rejected user input
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Priority model errors
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Snapshot persistence errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Validation errors raised at the request boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Title missing or blank after trimming
    #[error("title is required")]
    EmptyTitle,

    /// Title longer than the allowed number of characters
    #[error("title is too long ({len} characters, at most {max})")]
    TitleTooLong { len: usize, max: usize },

    /// Negative duration
    #[error("duration for '{field}' must not be negative (got {value})")]
    NegativeDuration { field: &'static str, value: f64 },

    /// NaN or infinite duration
    #[error("duration for '{field}' must be a finite number")]
    InvalidDuration { field: &'static str },

    /// Difficulty outside the 1..=10 scale
    #[error("{field} difficulty must be between 1 and 10 (got {value})")]
    DifficultyOutOfRange { field: &'static str, value: i64 },

    /// Task index that does not reference an existing task
    #[error("no task at index {index} (task count: {len})")]
    UnknownTask { index: usize, len: usize },

    /// Schedule requested with an empty task list
    #[error("add at least one task before generating a schedule")]
    NoTasks,
}

/// Priority model errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Inference requested before any successful training
    #[error("model has not been trained")]
    Untrained,

    /// A training is already running and the contention policy rejects waiting
    #[error("a training run is already in progress")]
    TrainingInProgress,

    /// Input vector does not match the network's input width
    #[error("expected {expected} features, got {actual}")]
    FeatureMismatch { expected: usize, actual: usize },

    /// The blocking training task panicked or was cancelled
    #[error("training aborted: {0}")]
    TrainingAborted(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Snapshot store errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Data directory could not be determined or created
    #[error("data directory unavailable: {0}")]
    DataDir(String),

    /// Snapshot file exists but cannot be decoded
    #[error("corrupt snapshot at {path}: {message}")]
    Corrupt { path: PathBuf, message: String },
}

impl From<tokio::task::JoinError> for ModelError {
    fn from(err: tokio::task::JoinError) -> Self {
        ModelError::TrainingAborted(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
