//! Application-level errors (wraps domain and store errors)

use std::fmt;

use thiserror::Error;

use crate::domain::{DomainError, ManualId};
use crate::infrastructure::StoreError;

/// Application errors wrap domain errors and add transaction context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("manual {manual} was changed by another request, reload and retry")]
    Conflict {
        manual: ManualId,
        #[source]
        source: StoreError,
    },

    #[error("transaction failed: {context}")]
    TransactionFailure {
        context: String,
        #[source]
        source: StoreError,
    },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Caller-facing error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    ValidationError,
    InvalidMove,
    ConflictError,
    TransactionFailure,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::ValidationError => "validation error",
            ErrorKind::InvalidMove => "invalid move",
            ErrorKind::ConflictError => "conflict",
            ErrorKind::TransactionFailure => "transaction failure",
            ErrorKind::Internal => "internal error",
        };
        f.write_str(s)
    }
}

impl ApplicationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApplicationError::Domain(e) => match e {
                DomainError::SectionNotFound(_) | DomainError::PolicyNotFound(_) => {
                    ErrorKind::NotFound
                }
                DomainError::Validation(_) => ErrorKind::ValidationError,
                DomainError::InvalidMove { .. } => ErrorKind::InvalidMove,
                DomainError::CorruptTree { .. } => ErrorKind::Internal,
            },
            ApplicationError::Conflict { .. } => ErrorKind::ConflictError,
            ApplicationError::TransactionFailure { .. } => ErrorKind::TransactionFailure,
            ApplicationError::Config { .. } | ApplicationError::OperationFailed { .. } => {
                ErrorKind::Internal
            }
        }
    }

    /// Map a store error raised while committing `manual`.
    pub fn from_store(manual: ManualId, context: impl Into<String>, source: StoreError) -> Self {
        match source {
            StoreError::VersionConflict { .. } => ApplicationError::Conflict { manual, source },
            other => ApplicationError::TransactionFailure {
                context: context.into(),
                source: other,
            },
        }
    }

    /// Wrap a store error raised outside a commit (reads, id allocation).
    pub fn store(context: impl Into<String>, source: StoreError) -> Self {
        ApplicationError::OperationFailed {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
