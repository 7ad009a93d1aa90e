//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::ids::{PolicyId, SectionId};

/// Domain errors represent violations of the tree rules.
/// They are detected before any write is planned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("section not found: {0}")]
    SectionNotFound(SectionId),

    #[error("policy not found: {0}")]
    PolicyNotFound(PolicyId),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid move of section {section}: {reason}")]
    InvalidMove { section: SectionId, reason: String },

    #[error("corrupt section tree at section {section}: {reason}")]
    CorruptTree { section: SectionId, reason: String },
}

impl DomainError {
    pub fn invalid_move(section: SectionId, reason: impl Into<String>) -> Self {
        Self::InvalidMove {
            section,
            reason: reason.into(),
        }
    }

    pub fn corrupt(section: SectionId, reason: impl Into<String>) -> Self {
        Self::CorruptTree {
            section,
            reason: reason.into(),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
