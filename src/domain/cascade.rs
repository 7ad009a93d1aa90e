//! Cascade deletion planning.
//!
//! Removal order per policy: approval workflows, document signatures,
//! annotations, acknowledgements, policy versions, then the policy row. A
//! section is removed after all of its policies, and only after every
//! descendant section (post-order), so each delete finds no remaining
//! references to the row it removes.

use serde::Serialize;
use tracing::{debug, instrument};

use crate::domain::arena::SectionArena;
use crate::domain::changes::Write;
use crate::domain::entities::ManualSnapshot;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::ids::{PolicyId, SectionId};

/// What a cascade removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    /// Removed sections, children before parents
    pub sections: Vec<SectionId>,
    pub policies: Vec<PolicyId>,
    pub policy_versions: usize,
    pub acknowledgements: usize,
    pub annotations: usize,
    pub approval_workflows: usize,
    pub signatures: usize,
}

impl DeletionReport {
    pub fn dependent_rows(&self) -> usize {
        self.policy_versions
            + self.acknowledgements
            + self.annotations
            + self.approval_workflows
            + self.signatures
    }
}

/// Append the deletes that remove `policy_id` and everything that depends on it.
///
/// This is the policy sub-store routine: it only plans, so the caller decides
/// which transaction the writes join.
pub fn plan_policy_removal(
    snapshot: &ManualSnapshot,
    policy_id: PolicyId,
    writes: &mut Vec<Write>,
    report: &mut DeletionReport,
) -> DomainResult<()> {
    if !snapshot.policies.contains_key(&policy_id) {
        return Err(DomainError::PolicyNotFound(policy_id));
    }

    for w in snapshot
        .approval_workflows
        .values()
        .filter(|w| w.policy_id == policy_id)
    {
        writes.push(Write::DeleteWorkflow(w.id));
        report.approval_workflows += 1;
    }
    for s in snapshot.signatures.values().filter(|s| s.policy_id == policy_id) {
        writes.push(Write::DeleteSignature(s.id));
        report.signatures += 1;
    }
    for a in snapshot.annotations.values().filter(|a| a.policy_id == policy_id) {
        writes.push(Write::DeleteAnnotation(a.id));
        report.annotations += 1;
    }
    for a in snapshot
        .acknowledgements
        .values()
        .filter(|a| a.policy_id == policy_id)
    {
        writes.push(Write::DeleteAcknowledgement(a.id));
        report.acknowledgements += 1;
    }
    for v in snapshot
        .policy_versions
        .values()
        .filter(|v| v.policy_id == policy_id)
    {
        writes.push(Write::DeletePolicyVersion(v.id));
        report.policy_versions += 1;
    }

    writes.push(Write::DeletePolicy(policy_id));
    report.policies.push(policy_id);
    Ok(())
}

/// Plan removal of `section_id`, its whole subtree and every dependent row.
#[instrument(level = "debug", skip(snapshot))]
pub fn plan_section_removal(
    snapshot: &ManualSnapshot,
    section_id: SectionId,
) -> DomainResult<(Vec<Write>, DeletionReport)> {
    snapshot.section(section_id)?;
    let tree = SectionArena::from_sections(snapshot.sections.values())?;

    let mut writes = Vec::new();
    let mut report = DeletionReport::default();
    for (_, node) in tree.iter_postorder(section_id) {
        for policy in snapshot.policies_of(node.id) {
            plan_policy_removal(snapshot, policy.id, &mut writes, &mut report)?;
        }
        writes.push(Write::DeleteSection(node.id));
        report.sections.push(node.id);
    }

    debug!(
        "cascade from section {}: {} sections, {} policies, {} dependent rows",
        section_id,
        report.sections.len(),
        report.policies.len(),
        report.dependent_rows()
    );
    Ok((writes, report))
}
