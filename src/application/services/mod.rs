//! Application services
//!
//! Concrete service implementations that orchestrate domain planning.
//! Services depend on the storage and audit boundary traits
//! (`DocumentStore`, `AuditSink`) but are themselves concrete structs.

mod cascade;
mod policies;
mod reorder;
mod sections;

pub use cascade::CascadeService;
pub use policies::PolicyService;
pub use reorder::ReorderService;
pub use sections::SectionService;

use tracing::warn;

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{DomainError, ManualId, ManualSnapshot, PolicyId, SectionId, Write};
use crate::infrastructure::traits::{AuditEvent, AuditSink, DocumentStore, Transaction};

/// Commit `writes` planned against `snapshot`; returns the new manual version.
fn commit(
    store: &dyn DocumentStore,
    snapshot: &ManualSnapshot,
    writes: Vec<Write>,
    context: &str,
) -> ApplicationResult<u64> {
    let manual = snapshot.manual_id;
    store
        .commit(Transaction::new(snapshot, writes))
        .map_err(|e| ApplicationError::from_store(manual, context, e))
}

/// Best-effort audit: a failing sink is logged, never returned.
fn record_audit(audit: &dyn AuditSink, event: AuditEvent) {
    if let Err(e) = audit.record(&event) {
        warn!(
            "audit event {} {} {} not recorded: {}",
            event.entity_type, event.entity_id, event.action, e
        );
    }
}

/// Load the manual owning `section_id`.
fn load_for_section(
    store: &dyn DocumentStore,
    section_id: SectionId,
) -> ApplicationResult<ManualSnapshot> {
    let manual = locate_section(store, section_id)?;
    load(store, manual)
}

fn locate_section(store: &dyn DocumentStore, section_id: SectionId) -> ApplicationResult<ManualId> {
    store
        .locate_section(section_id)
        .map_err(|e| ApplicationError::store("locate section", e))?
        .ok_or_else(|| DomainError::SectionNotFound(section_id).into())
}

fn locate_policy(store: &dyn DocumentStore, policy_id: PolicyId) -> ApplicationResult<ManualId> {
    store
        .locate_policy(policy_id)
        .map_err(|e| ApplicationError::store("locate policy", e))?
        .ok_or_else(|| DomainError::PolicyNotFound(policy_id).into())
}

fn load(store: &dyn DocumentStore, manual: ManualId) -> ApplicationResult<ManualSnapshot> {
    store
        .load(manual)
        .map_err(|e| ApplicationError::store(format!("load manual {manual}"), e))
}

fn allocate_id(store: &dyn DocumentStore) -> ApplicationResult<u64> {
    store
        .allocate_id()
        .map_err(|e| ApplicationError::store("allocate id", e))
}
