//! Recovery error types
//!
//! Faults raised inside the engine are values, never panics. Strategy faults
//! are downgraded to "try the next strategy" by the engine, diagnosis faults
//! collapse into a generic processing-error diagnosis, and sink faults are
//! logged and dropped.

use thiserror::Error;

/// Result type alias for recovery operations
pub type RecoveryResult<T> = Result<T, RecoveryError>;

/// Errors that can occur while diagnosing or recovering an utterance
#[derive(Error, Debug)]
pub enum RecoveryError {
    /// A single strategy trial raised instead of returning an outcome
    #[error("Strategy {strategy} failed: {reason}")]
    StrategyFailed { strategy: String, reason: String },

    /// The caller handed over a context that cannot be worked with
    #[error("Malformed recovery context: {0}")]
    MalformedContext(String),

    /// The dialect-tagging collaborator could not tag the text
    #[error("Dialect tagging failed: {0}")]
    DialectTagging(String),

    /// The durable sink rejected a record
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// JSON (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RecoveryError {
    /// Shorthand for a strategy fault
    pub fn strategy(strategy: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StrategyFailed {
            strategy: strategy.into(),
            reason: reason.into(),
        }
    }

    /// Machine-readable code for logs and learning records
    pub fn code(&self) -> &'static str {
        match self {
            Self::StrategyFailed { .. } => "STRATEGY_FAILED",
            Self::MalformedContext(_) => "MALFORMED_CONTEXT",
            Self::DialectTagging(_) => "DIALECT_TAGGING_FAILED",
            Self::Sink(_) => "SINK_FAILED",
            Self::Serialization(_) => "SERIALIZATION_FAILED",
        }
    }
}

/// Failure reported by a durable sink
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("Sink unavailable: {0}")]
    Unavailable(String),

    #[error("Sink rejected record {record_id}: {reason}")]
    Rejected { record_id: String, reason: String },
}
