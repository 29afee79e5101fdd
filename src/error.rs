//! Error types for hetsched
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in the scheduler core
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Pop on an empty priority structure
    #[error("Priority queue is empty")]
    QueueEmpty,

    /// Intensity score that is negative, NaN or infinite
    #[error("Invalid intensity for task {id}: {value}")]
    InvalidIntensity { id: u64, value: f64 },

    /// Rejected configuration value
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Write-once task field written a second time
    #[error("Task {id} already has a {field}")]
    AlreadySet { id: u64, field: &'static str },

    /// Router started twice on the same scheduler
    #[error("Router already started")]
    AlreadyStarted,

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for scheduler operations
pub type Result<T> = std::result::Result<T, SchedulerError>;
