//! Infrastructure-level errors

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::ManualId;

/// Errors raised by a `DocumentStore`.
///
/// Any of these aborts the transaction being committed; the stored manual is
/// left exactly as it was.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("manual {manual} changed concurrently: planned against version {expected}, store is at {actual}")]
    VersionConflict {
        manual: ManualId,
        expected: u64,
        actual: u64,
    },

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("store data is malformed: {0}")]
    Format(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn constraint(message: impl Into<String>) -> Self {
        Self::Constraint(message.into())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by an `AuditSink`. Never propagated past the service that emits.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("audit write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("audit event not serializable: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}

/// Infrastructure errors wrap application errors and add I/O-level concerns.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl InfraError {
    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type for infrastructure layer operations.
pub type InfraResult<T> = Result<T, InfraError>;
