//! Storage and audit boundary traits
//!
//! Services depend on these traits so they can run against the in-memory
//! store in tests and the JSON file store from the CLI.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{ManualId, ManualSnapshot, PolicyId, SectionId, UserId, Write};
use crate::infrastructure::error::{AuditError, StoreResult};

/// An ordered write set for one manual, planned against `expected_version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub manual_id: ManualId,
    pub expected_version: u64,
    pub writes: Vec<Write>,
}

impl Transaction {
    pub fn new(snapshot: &ManualSnapshot, writes: Vec<Write>) -> Self {
        Self {
            manual_id: snapshot.manual_id,
            expected_version: snapshot.version,
            writes,
        }
    }
}

/// Relational store holding the section trees of many manuals.
pub trait DocumentStore: Send + Sync {
    /// Every row of one manual. A manual never written is empty at version 0.
    fn load(&self, manual_id: ManualId) -> StoreResult<ManualSnapshot>;

    /// Apply a transaction atomically and return the manual's new version.
    ///
    /// Fails without side effects if the manual moved past
    /// `expected_version` or any write breaks a referential rule.
    fn commit(&self, tx: Transaction) -> StoreResult<u64>;

    /// Next value of the store-wide id sequence. Never reused.
    fn allocate_id(&self) -> StoreResult<u64>;

    /// Manual owning a section, if the section exists.
    fn locate_section(&self, id: SectionId) -> StoreResult<Option<ManualId>>;

    /// Manual owning a policy, if the policy exists.
    fn locate_policy(&self, id: PolicyId) -> StoreResult<Option<ManualId>>;

    /// Manuals that have at least one committed transaction.
    fn manuals(&self) -> StoreResult<Vec<ManualId>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => f.write_str("info"),
            Severity::Warning => f.write_str("warning"),
            Severity::Critical => f.write_str("critical"),
        }
    }
}

/// Post-hoc notification of a structural change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEvent {
    pub at: DateTime<Utc>,
    pub actor_id: Option<UserId>,
    pub entity_type: &'static str,
    pub entity_id: String,
    pub action: &'static str,
    pub details: serde_json::Value,
    pub severity: Severity,
}

impl AuditEvent {
    pub fn new(
        actor_id: Option<&UserId>,
        entity_type: &'static str,
        entity_id: impl ToString,
        action: &'static str,
    ) -> Self {
        Self {
            at: Utc::now(),
            actor_id: actor_id.cloned(),
            entity_type,
            entity_id: entity_id.to_string(),
            action,
            details: serde_json::Value::Null,
            severity: Severity::Info,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

/// Fire-and-forget receiver of audit events.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError>;
}
