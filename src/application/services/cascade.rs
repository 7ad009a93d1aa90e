//! Cascade deletion of sections and policies

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use super::{commit, load, load_for_section, locate_policy, record_audit};
use crate::application::ApplicationResult;
use crate::config::Settings;
use crate::domain::planner::plan_renumber;
use crate::domain::{
    plan_policy_removal, plan_section_removal, DeletionReport, DomainError, PolicyId, SectionId,
    UserId, Write,
};
use crate::infrastructure::traits::{AuditEvent, AuditSink, DocumentStore, Severity};

pub struct CascadeService {
    store: Arc<dyn DocumentStore>,
    audit: Arc<dyn AuditSink>,
    settings: Arc<Settings>,
}

impl CascadeService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        audit: Arc<dyn AuditSink>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            store,
            audit,
            settings,
        }
    }

    /// Delete a section, its subtree and every record hanging off their
    /// policies, in one transaction.
    ///
    /// Numbers of the surviving sections are re-derived in the same
    /// transaction. Former siblings keep their `order_index` unless
    /// `renumber_after_delete` is set.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_section(
        &self,
        actor: &UserId,
        section_id: SectionId,
    ) -> ApplicationResult<DeletionReport> {
        let snapshot = load_for_section(self.store.as_ref(), section_id)?;
        let (mut writes, report) = plan_section_removal(&snapshot, section_id)?;

        let removed: HashSet<SectionId> = report.sections.iter().copied().collect();
        let mut remaining = snapshot.sections.clone();
        remaining.retain(|id, _| !removed.contains(id));
        writes.extend(plan_renumber(
            &remaining,
            self.settings.renumber_after_delete,
            Utc::now(),
        )?);
        commit(self.store.as_ref(), &snapshot, writes, "delete section")?;

        info!(
            "deleted section {}: {} sections, {} policies, {} dependent rows",
            section_id,
            report.sections.len(),
            report.policies.len(),
            report.dependent_rows()
        );
        record_audit(
            self.audit.as_ref(),
            AuditEvent::new(Some(actor), "section", section_id, "delete")
                .with_details(serde_json::to_value(&report).unwrap_or_default())
                .with_severity(Severity::Warning),
        );
        Ok(report)
    }

    /// Delete one policy with its versions, acknowledgements, annotations,
    /// workflows and signatures. Remaining policies of the section close up.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_policy(
        &self,
        actor: &UserId,
        policy_id: PolicyId,
    ) -> ApplicationResult<DeletionReport> {
        let manual = locate_policy(self.store.as_ref(), policy_id)?;
        let snapshot = load(self.store.as_ref(), manual)?;
        let section_id = snapshot
            .policies
            .get(&policy_id)
            .map(|p| p.section_id)
            .ok_or(DomainError::PolicyNotFound(policy_id))?;

        let mut writes = Vec::new();
        let mut report = DeletionReport::default();
        plan_policy_removal(&snapshot, policy_id, &mut writes, &mut report)?;

        let survivors = snapshot
            .policies_of(section_id)
            .into_iter()
            .filter(|p| p.id != policy_id);
        for (index, policy) in survivors.enumerate() {
            if policy.order_index != index as u32 {
                let mut policy = policy.clone();
                policy.order_index = index as u32;
                writes.push(Write::PutPolicy(policy));
            }
        }
        commit(self.store.as_ref(), &snapshot, writes, "delete policy")?;

        info!(
            "deleted policy {} of section {}: {} dependent rows",
            policy_id,
            section_id,
            report.dependent_rows()
        );
        record_audit(
            self.audit.as_ref(),
            AuditEvent::new(Some(actor), "policy", policy_id, "delete")
                .with_details(serde_json::to_value(&report).unwrap_or_default())
                .with_severity(Severity::Warning),
        );
        Ok(report)
    }
}
