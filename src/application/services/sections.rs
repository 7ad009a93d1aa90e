//! Section queries, creation, field updates and numbering repair

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, instrument};

use super::{allocate_id, commit, load, load_for_section, record_audit};
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::forest::{assemble_hierarchy, list_sections};
use crate::domain::planner::{plan_create, plan_renumber};
use crate::domain::{
    check_invariants, DomainError, ManualId, NewSection, Section, SectionId, SectionListing,
    SectionPatch, SectionTree, UserId, Violation, Write,
};
use crate::infrastructure::traits::{AuditEvent, AuditSink, DocumentStore};

pub struct SectionService {
    store: Arc<dyn DocumentStore>,
    audit: Arc<dyn AuditSink>,
}

impl SectionService {
    pub fn new(store: Arc<dyn DocumentStore>, audit: Arc<dyn AuditSink>) -> Self {
        Self { store, audit }
    }

    /// Flat listing ordered by `(level, order_index)`, each with its policies.
    pub fn list_sections(&self, manual: ManualId) -> ApplicationResult<Vec<SectionListing>> {
        let snapshot = load(self.store.as_ref(), manual)?;
        Ok(list_sections(&snapshot))
    }

    /// The manual as a nested forest in sibling order.
    #[instrument(level = "debug", skip(self))]
    pub fn hierarchy(&self, manual: ManualId) -> ApplicationResult<Vec<SectionTree>> {
        let snapshot = load(self.store.as_ref(), manual)?;
        Ok(assemble_hierarchy(&snapshot)?)
    }

    /// Append a new section after the existing siblings under its parent.
    #[instrument(level = "debug", skip(self, new), fields(manual = %new.manual_id))]
    pub fn create_section(&self, actor: &UserId, new: NewSection) -> ApplicationResult<Section> {
        new.validate()?;
        if let Some(parent) = new.parent_section_id {
            let owner = self
                .store
                .locate_section(parent)
                .map_err(|e| ApplicationError::store("locate parent section", e))?
                .ok_or(DomainError::SectionNotFound(parent))?;
            if owner != new.manual_id {
                return Err(DomainError::Validation(format!(
                    "parent section {parent} belongs to manual {owner}, not {}",
                    new.manual_id
                ))
                .into());
            }
        }

        let snapshot = load(self.store.as_ref(), new.manual_id)?;
        let id = SectionId(allocate_id(self.store.as_ref())?);
        let section = plan_create(&snapshot, &new, id, Some(actor), Utc::now())?;
        commit(
            self.store.as_ref(),
            &snapshot,
            vec![Write::PutSection(section.clone())],
            "create section",
        )?;

        info!("created section {} '{}' as {}", id, section.title, section.section_number);
        record_audit(
            self.audit.as_ref(),
            AuditEvent::new(Some(actor), "section", id, "create").with_details(json!({
                "manual_id": section.manual_id,
                "parent_section_id": section.parent_section_id,
                "section_number": section.section_number,
            })),
        );
        Ok(section)
    }

    /// Merge non-structural fields. An unchanged section is not written.
    #[instrument(level = "debug", skip(self, patch))]
    pub fn update_section(
        &self,
        actor: &UserId,
        section_id: SectionId,
        patch: SectionPatch,
    ) -> ApplicationResult<Section> {
        patch.validate()?;
        let snapshot = load_for_section(self.store.as_ref(), section_id)?;
        let mut section = snapshot.section(section_id)?.clone();
        if !patch.apply(&mut section) {
            debug!("section {} unchanged by patch", section_id);
            return Ok(section);
        }
        section.updated_at = Utc::now();
        commit(
            self.store.as_ref(),
            &snapshot,
            vec![Write::PutSection(section.clone())],
            "update section",
        )?;

        record_audit(
            self.audit.as_ref(),
            AuditEvent::new(Some(actor), "section", section_id, "update")
                .with_details(serde_json::to_value(&patch).unwrap_or_default()),
        );
        Ok(section)
    }

    /// Close sibling gaps and re-derive every level and number.
    ///
    /// Returns the number of sections rewritten.
    #[instrument(level = "debug", skip(self))]
    pub fn renumber_all(&self, actor: &UserId, manual: ManualId) -> ApplicationResult<usize> {
        let snapshot = load(self.store.as_ref(), manual)?;
        let writes = plan_renumber(&snapshot.sections, true, Utc::now())?;
        let changed = writes.len();
        if changed == 0 {
            debug!("manual {} already consistent", manual);
            return Ok(0);
        }
        commit(self.store.as_ref(), &snapshot, writes, "renumber manual")?;

        info!("renumbered manual {}: {} sections changed", manual, changed);
        record_audit(
            self.audit.as_ref(),
            AuditEvent::new(Some(actor), "manual", manual, "renumber")
                .with_details(json!({ "changed": changed })),
        );
        Ok(changed)
    }

    /// Every structural invariant the stored manual currently violates.
    pub fn verify(&self, manual: ManualId) -> ApplicationResult<Vec<Violation>> {
        let snapshot = load(self.store.as_ref(), manual)?;
        Ok(check_invariants(&snapshot))
    }
}
