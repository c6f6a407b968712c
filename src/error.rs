//! Error types for quantum-tasks.

use std::time::Duration;

use uuid::Uuid;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Rejections raised before any task is created.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Circuit payload cannot be empty")]
    EmptyPayload,

    #[error("Circuit payload exceeds maximum size of {max} bytes (got {size})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Invalid query parameter {field}: {reason}")]
    InvalidQuery { field: String, reason: String },
}

/// Failures reported by a circuit executor.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExecutorError {
    /// The payload is not a valid program. Never retried.
    #[error("Invalid QASM3 string: {0}")]
    Parse(String),

    /// Execution failed. `transient` failures may succeed on another attempt.
    #[error("Circuit execution failed: {reason}")]
    Compute { reason: String, transient: bool },
}

impl ExecutorError {
    pub fn permanent(reason: impl Into<String>) -> Self {
        Self::Compute {
            reason: reason.into(),
            transient: false,
        }
    }

    pub fn transient(reason: impl Into<String>) -> Self {
        Self::Compute {
            reason: reason.into(),
            transient: true,
        }
    }
}

/// Outcome classification of a single failed attempt.
///
/// The orchestrator retries only `Retryable`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ActivityError {
    #[error("Task {0} not found")]
    NotFound(Uuid),

    #[error("Terminal failure: {0}")]
    Terminal(String),

    #[error("Retryable failure: {0}")]
    Retryable(String),
}

impl ActivityError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }
}

/// Failures starting or addressing a durable run.
#[derive(Debug, thiserror::Error)]
pub enum OrchestrationError {
    #[error("Orchestrator is not accepting runs")]
    Unavailable,

    #[error("Run {run_id} did not acknowledge start within {timeout:?}")]
    StartTimeout { run_id: String, timeout: Duration },

    #[error("Run {run_id} has an invalid identity: {reason}")]
    InvalidRunId { run_id: String, reason: String },

    #[error("Run bookkeeping failed: {0}")]
    Database(#[from] DatabaseError),
}

/// Errors surfaced by the task service to callers.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Task {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}
