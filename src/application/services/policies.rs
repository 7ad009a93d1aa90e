//! Policy creation and acknowledgement

use std::sync::Arc;

use serde_json::json;
use tracing::{info, instrument};

use super::{allocate_id, commit, load, load_for_section, locate_policy, record_audit};
use crate::application::ApplicationResult;
use crate::domain::{
    Acknowledgement, AcknowledgementId, DomainError, Policy, PolicyId, PolicyVersion,
    PolicyVersionId, SectionId, UserId, Write,
};
use crate::infrastructure::traits::{AuditEvent, AuditSink, DocumentStore};

pub struct PolicyService {
    store: Arc<dyn DocumentStore>,
    audit: Arc<dyn AuditSink>,
}

impl PolicyService {
    pub fn new(store: Arc<dyn DocumentStore>, audit: Arc<dyn AuditSink>) -> Self {
        Self { store, audit }
    }

    /// Append a policy to a section, with an initial version 1 as current.
    #[instrument(level = "debug", skip(self))]
    pub fn add_policy(
        &self,
        actor: &UserId,
        section_id: SectionId,
        title: &str,
    ) -> ApplicationResult<Policy> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DomainError::Validation("policy title must not be empty".into()).into());
        }
        let store = self.store.as_ref();
        let snapshot = load_for_section(store, section_id)?;
        let order_index = snapshot
            .policies_of(section_id)
            .iter()
            .map(|p| p.order_index + 1)
            .max()
            .unwrap_or(0);

        let policy_id = PolicyId(allocate_id(store)?);
        let version_id = PolicyVersionId(allocate_id(store)?);
        let policy = Policy {
            id: policy_id,
            section_id,
            order_index,
            current_version_id: Some(version_id),
            title: title.to_string(),
        };
        let version = PolicyVersion {
            id: version_id,
            policy_id,
            version_number: 1,
        };
        commit(
            store,
            &snapshot,
            vec![Write::PutPolicy(policy.clone()), Write::PutPolicyVersion(version)],
            "add policy",
        )?;

        info!("added policy {} '{}' to section {}", policy_id, policy.title, section_id);
        record_audit(
            self.audit.as_ref(),
            AuditEvent::new(Some(actor), "policy", policy_id, "create")
                .with_details(json!({ "section_id": section_id, "version_id": version_id })),
        );
        Ok(policy)
    }

    /// Record that `actor` acknowledged the current version of a policy.
    #[instrument(level = "debug", skip(self))]
    pub fn acknowledge(
        &self,
        actor: &UserId,
        policy_id: PolicyId,
    ) -> ApplicationResult<Acknowledgement> {
        let store = self.store.as_ref();
        let manual = locate_policy(store, policy_id)?;
        let snapshot = load(store, manual)?;
        let policy = snapshot
            .policies
            .get(&policy_id)
            .ok_or(DomainError::PolicyNotFound(policy_id))?;
        let version_id = policy.current_version_id.ok_or_else(|| {
            DomainError::Validation(format!("policy {policy_id} has no current version"))
        })?;

        let ack = Acknowledgement {
            id: AcknowledgementId(allocate_id(store)?),
            policy_id,
            policy_version_id: version_id,
            user_id: actor.clone(),
        };
        commit(
            store,
            &snapshot,
            vec![Write::PutAcknowledgement(ack.clone())],
            "acknowledge policy",
        )?;

        record_audit(
            self.audit.as_ref(),
            AuditEvent::new(Some(actor), "policy", policy_id, "acknowledge")
                .with_details(json!({ "version_id": version_id })),
        );
        Ok(ack)
    }
}
