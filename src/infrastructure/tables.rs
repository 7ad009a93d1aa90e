//! Table state shared by the store implementations, with referential checks.
//!
//! A commit is applied to a copy of the manual; rules are checked write by
//! write, so the order of a write set matters exactly as it would with
//! immediate foreign keys.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::domain::*;
use crate::infrastructure::error::{StoreError, StoreResult};
use crate::infrastructure::traits::Transaction;

/// Everything a store holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreData {
    /// Last id handed out by the sequence
    pub last_id: u64,
    pub manuals: BTreeMap<ManualId, ManualSnapshot>,
}

impl StoreData {
    pub fn load(&self, manual_id: ManualId) -> ManualSnapshot {
        self.manuals
            .get(&manual_id)
            .cloned()
            .unwrap_or_else(|| ManualSnapshot::empty(manual_id))
    }

    pub fn allocate_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    pub fn locate_section(&self, id: SectionId) -> Option<ManualId> {
        self.manuals
            .values()
            .find(|m| m.sections.contains_key(&id))
            .map(|m| m.manual_id)
    }

    pub fn locate_policy(&self, id: PolicyId) -> Option<ManualId> {
        self.manuals
            .values()
            .find(|m| m.policies.contains_key(&id))
            .map(|m| m.manual_id)
    }

    /// Check the version and apply the writes to a copy of the manual.
    ///
    /// Returns the manual as it will look after the commit; `self` is untouched.
    pub fn prepare(&self, tx: &Transaction) -> StoreResult<ManualSnapshot> {
        let mut manual = self.load(tx.manual_id);
        if manual.version != tx.expected_version {
            return Err(StoreError::VersionConflict {
                manual: tx.manual_id,
                expected: tx.expected_version,
                actual: manual.version,
            });
        }
        for write in &tx.writes {
            trace!("apply: {}", write.describe());
            apply_write(&mut manual, write)?;
        }
        manual.version += 1;
        debug!(
            "prepared manual {} at version {} ({} writes)",
            tx.manual_id,
            manual.version,
            tx.writes.len()
        );
        Ok(manual)
    }

    pub fn install(&mut self, manual: ManualSnapshot) {
        self.manuals.insert(manual.manual_id, manual);
    }
}

fn require(present: bool, message: impl FnOnce() -> String) -> StoreResult<()> {
    if present {
        Ok(())
    } else {
        Err(StoreError::constraint(message()))
    }
}

fn apply_write(m: &mut ManualSnapshot, write: &Write) -> StoreResult<()> {
    match write {
        Write::PutSection(s) => {
            require(
                s.manual_id == m.manual_id,
                || format!("section {} belongs to manual {}, not {}", s.id, s.manual_id, m.manual_id),
            )?;
            if let Some(parent) = s.parent_section_id {
                require(parent != s.id, || format!("section {} is its own parent", s.id))?;
                require(
                    m.sections.contains_key(&parent),
                    || format!("parent section {parent} of {} does not exist in manual {}", s.id, m.manual_id),
                )?;
            }
            m.sections.insert(s.id, s.clone());
        }
        Write::DeleteSection(id) => {
            require(
                !m.sections.values().any(|s| s.parent_section_id == Some(*id)),
                || format!("section {id} still has child sections"),
            )?;
            require(
                !m.policies.values().any(|p| p.section_id == *id),
                || format!("section {id} still owns policies"),
            )?;
            m.sections
                .remove(id)
                .ok_or_else(|| StoreError::constraint(format!("section {id} does not exist")))?;
        }
        Write::PutPolicy(p) => {
            require(
                m.sections.contains_key(&p.section_id),
                || format!("section {} of policy {} does not exist", p.section_id, p.id),
            )?;
            m.policies.insert(p.id, p.clone());
        }
        Write::DeletePolicy(id) => {
            let referenced = m.policy_versions.values().any(|v| v.policy_id == *id)
                || m.acknowledgements.values().any(|a| a.policy_id == *id)
                || m.annotations.values().any(|a| a.policy_id == *id)
                || m.approval_workflows.values().any(|w| w.policy_id == *id)
                || m.signatures.values().any(|s| s.policy_id == *id);
            require(!referenced, || format!("policy {id} still has dependent records"))?;
            m.policies
                .remove(id)
                .ok_or_else(|| StoreError::constraint(format!("policy {id} does not exist")))?;
        }
        Write::PutPolicyVersion(v) => {
            require_policy(m, v.policy_id)?;
            m.policy_versions.insert(v.id, v.clone());
        }
        Write::DeletePolicyVersion(id) => {
            let referenced = m.acknowledgements.values().any(|a| a.policy_version_id == *id)
                || m.approval_workflows.values().any(|w| w.policy_version_id == *id)
                || m.signatures.values().any(|s| s.policy_version_id == *id);
            require(!referenced, || format!("policy version {id} is still referenced"))?;
            m.policy_versions.remove(id).ok_or_else(|| {
                StoreError::constraint(format!("policy version {id} does not exist"))
            })?;
        }
        Write::PutAcknowledgement(a) => {
            require_version(m, a.policy_id, a.policy_version_id)?;
            m.acknowledgements.insert(a.id, a.clone());
        }
        Write::DeleteAcknowledgement(id) => {
            m.acknowledgements.remove(id).ok_or_else(|| {
                StoreError::constraint(format!("acknowledgement {id} does not exist"))
            })?;
        }
        Write::PutAnnotation(a) => {
            require_policy(m, a.policy_id)?;
            m.annotations.insert(a.id, a.clone());
        }
        Write::DeleteAnnotation(id) => {
            m.annotations
                .remove(id)
                .ok_or_else(|| StoreError::constraint(format!("annotation {id} does not exist")))?;
        }
        Write::PutWorkflow(w) => {
            require_version(m, w.policy_id, w.policy_version_id)?;
            m.approval_workflows.insert(w.id, w.clone());
        }
        Write::DeleteWorkflow(id) => {
            m.approval_workflows.remove(id).ok_or_else(|| {
                StoreError::constraint(format!("approval workflow {id} does not exist"))
            })?;
        }
        Write::PutSignature(s) => {
            require_version(m, s.policy_id, s.policy_version_id)?;
            m.signatures.insert(s.id, s.clone());
        }
        Write::DeleteSignature(id) => {
            m.signatures
                .remove(id)
                .ok_or_else(|| StoreError::constraint(format!("signature {id} does not exist")))?;
        }
    }
    Ok(())
}

fn require_policy(m: &ManualSnapshot, policy_id: PolicyId) -> StoreResult<()> {
    require(
        m.policies.contains_key(&policy_id),
        || format!("policy {policy_id} does not exist"),
    )
}

fn require_version(
    m: &ManualSnapshot,
    policy_id: PolicyId,
    version_id: PolicyVersionId,
) -> StoreResult<()> {
    require_policy(m, policy_id)?;
    require(
        m.policy_versions
            .get(&version_id)
            .is_some_and(|v| v.policy_id == policy_id),
        || format!("policy version {version_id} of policy {policy_id} does not exist"),
    )
}
