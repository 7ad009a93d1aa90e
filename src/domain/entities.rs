//! Domain entities: sections, policies and the records that hang off a policy

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::error::DomainError;
use crate::domain::ids::*;

/// Node in the outline of a manual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub manual_id: ManualId,
    /// None for root-level sections
    pub parent_section_id: Option<SectionId>,
    /// Depth in the tree, 0 at root. Derived, recomputed with `section_number`.
    pub level: u32,
    /// Canonical dotted number, e.g. `1.0`, `1.2`, `1.2.3`
    pub section_number: String,
    /// 0-based position among siblings
    pub order_index: u32,
    pub title: String,
    pub description: Option<String>,
    /// UI hint only
    #[serde(default)]
    pub is_collapsed: bool,
    pub created_by_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Content owned by a section. Does not take part in section numbering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    pub section_id: SectionId,
    pub order_index: u32,
    /// Soft pointer, not enforced as a foreign key by the store
    pub current_version_id: Option<PolicyVersionId>,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyVersion {
    pub id: PolicyVersionId,
    pub policy_id: PolicyId,
    pub version_number: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub id: AcknowledgementId,
    pub policy_id: PolicyId,
    pub policy_version_id: PolicyVersionId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub policy_id: PolicyId,
    pub author_id: UserId,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalWorkflow {
    pub id: WorkflowId,
    pub policy_id: PolicyId,
    pub policy_version_id: PolicyVersionId,
    pub status: WorkflowStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSignature {
    pub id: SignatureId,
    pub policy_id: PolicyId,
    pub policy_version_id: PolicyVersionId,
    pub signer_id: UserId,
}

/// Every row belonging to one manual, as seen at `version`.
///
/// `version` is the optimistic concurrency counter: 0 for a manual that has
/// never been written, incremented by every successful commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualSnapshot {
    pub manual_id: ManualId,
    pub version: u64,
    pub sections: BTreeMap<SectionId, Section>,
    pub policies: BTreeMap<PolicyId, Policy>,
    pub policy_versions: BTreeMap<PolicyVersionId, PolicyVersion>,
    pub acknowledgements: BTreeMap<AcknowledgementId, Acknowledgement>,
    pub annotations: BTreeMap<AnnotationId, Annotation>,
    pub approval_workflows: BTreeMap<WorkflowId, ApprovalWorkflow>,
    pub signatures: BTreeMap<SignatureId, DocumentSignature>,
}

impl ManualSnapshot {
    pub fn empty(manual_id: ManualId) -> Self {
        Self {
            manual_id,
            ..Default::default()
        }
    }

    pub fn section(&self, id: SectionId) -> Result<&Section, DomainError> {
        self.sections
            .get(&id)
            .ok_or(DomainError::SectionNotFound(id))
    }

    /// Sections as a flat list ordered by `(level, order_index)`.
    pub fn sections_by_level(&self) -> Vec<&Section> {
        let mut sections: Vec<&Section> = self.sections.values().collect();
        sections.sort_by_key(|s| (s.level, s.order_index, s.id));
        sections
    }

    /// Policies of one section in `order_index` order.
    pub fn policies_of(&self, section_id: SectionId) -> Vec<&Policy> {
        let mut policies: Vec<&Policy> = self
            .policies
            .values()
            .filter(|p| p.section_id == section_id)
            .collect();
        policies.sort_by_key(|p| (p.order_index, p.id));
        policies
    }

    /// Direct children of `parent` (or the roots for `None`) in sibling order.
    pub fn children_of(&self, parent: Option<SectionId>) -> Vec<&Section> {
        let mut children: Vec<&Section> = self
            .sections
            .values()
            .filter(|s| s.parent_section_id == parent)
            .collect();
        children.sort_by_key(|s| (s.order_index, s.id));
        children
    }
}

/// Fields supplied when creating a section; tree position fields are computed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSection {
    pub manual_id: ManualId,
    pub parent_section_id: Option<SectionId>,
    pub title: String,
    pub description: Option<String>,
}

impl NewSection {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::Validation("section title must not be empty".into()));
        }
        Ok(())
    }
}

/// Partial update of the non-structural fields of a section.
///
/// `description: Some(None)` clears the description. In JSON an absent
/// `description` leaves it alone and `"description": null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionPatch {
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "present_field",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    pub is_collapsed: Option<bool>,
}

/// A field that is present, even as `null`, deserializes to `Some`.
fn present_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl SectionPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.is_collapsed.is_none()
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.is_empty() {
            return Err(DomainError::Validation("patch contains no fields".into()));
        }
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(DomainError::Validation(
                    "section title must not be empty".into(),
                ));
            }
        }
        Ok(())
    }

    /// Merge into `section`. Returns true if anything changed.
    pub fn apply(&self, section: &mut Section) -> bool {
        let before = section.clone();
        if let Some(title) = &self.title {
            section.title = title.trim().to_string();
        }
        if let Some(description) = &self.description {
            section.description = description.clone();
        }
        if let Some(collapsed) = self.is_collapsed {
            section.is_collapsed = collapsed;
        }
        *section != before
    }
}
