//! Single-section moves and bulk hierarchy reorders

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, instrument};

use super::{commit, load, locate_section, record_audit};
use crate::application::ApplicationResult;
use crate::domain::planner::{plan_hierarchy, plan_move};
use crate::domain::{DomainError, HierarchyNode, ManualId, MovePlan, SectionId, UserId};
use crate::infrastructure::traits::{AuditEvent, AuditSink, DocumentStore};

pub struct ReorderService {
    store: Arc<dyn DocumentStore>,
    audit: Arc<dyn AuditSink>,
}

impl ReorderService {
    pub fn new(store: Arc<dyn DocumentStore>, audit: Arc<dyn AuditSink>) -> Self {
        Self { store, audit }
    }

    /// Move a section (with its subtree) under `new_parent` at `new_order_index`.
    ///
    /// `None` moves it to the root level. All checks run before any write is
    /// planned; the manual is renumbered in the same transaction.
    #[instrument(level = "debug", skip(self))]
    pub fn move_section(
        &self,
        actor: &UserId,
        section_id: SectionId,
        new_parent: Option<SectionId>,
        new_order_index: u32,
    ) -> ApplicationResult<MovePlan> {
        let store = self.store.as_ref();
        let manual = locate_section(store, section_id)?;
        if let Some(parent) = new_parent {
            let parent_manual = locate_section(store, parent)?;
            if parent_manual != manual {
                return Err(DomainError::invalid_move(
                    section_id,
                    format!("target parent {parent} belongs to manual {parent_manual}, not {manual}"),
                )
                .into());
            }
        }

        let snapshot = load(store, manual)?;
        let plan = plan_move(&snapshot, section_id, new_parent, new_order_index, Utc::now())?;
        if plan.writes.is_empty() {
            debug!("section {} already at requested position", section_id);
            return Ok(plan);
        }
        commit(store, &snapshot, plan.writes.clone(), "move section")?;

        info!(
            "moved section {} from {} to {} ({} rows)",
            section_id,
            plan.old_number,
            plan.new_number,
            plan.writes.len()
        );
        record_audit(
            self.audit.as_ref(),
            AuditEvent::new(Some(actor), "section", section_id, "move").with_details(json!({
                "from_parent": plan.from_parent,
                "to_parent": plan.to_parent,
                "order_index": plan.order_index,
                "old_number": plan.old_number,
                "new_number": plan.new_number,
            })),
        );
        Ok(plan)
    }

    /// Apply a full ordering submitted as a forest; returns the number of
    /// sections rewritten.
    #[instrument(level = "debug", skip(self, forest), fields(roots = forest.len()))]
    pub fn apply_hierarchy(
        &self,
        actor: &UserId,
        forest: &[HierarchyNode],
    ) -> ApplicationResult<usize> {
        let store = self.store.as_ref();
        let ids = payload_ids(forest);
        let Some(&first) = ids.first() else {
            return Err(DomainError::Validation("hierarchy payload is empty".into()).into());
        };
        let manual = locate_section(store, first)?;
        for &id in &ids[1..] {
            let owner = locate_section(store, id)?;
            if owner != manual {
                return Err(DomainError::invalid_move(
                    id,
                    format!("section belongs to manual {owner}, payload targets manual {manual}"),
                )
                .into());
            }
        }

        let snapshot = load(store, manual)?;
        let writes = plan_hierarchy(&snapshot, forest, Utc::now())?;
        let changed = writes.len();
        if changed > 0 {
            commit(store, &snapshot, writes, "apply hierarchy")?;
        }

        info!("applied hierarchy to manual {}: {} sections changed", manual, changed);
        record_audit(
            self.audit.as_ref(),
            AuditEvent::new(Some(actor), "manual", manual, "reorder")
                .with_details(json!({ "sections": ids.len(), "changed": changed })),
        );
        Ok(changed)
    }

    /// Manual that a payload would be applied to, if it names any section.
    pub fn target_manual(&self, forest: &[HierarchyNode]) -> ApplicationResult<Option<ManualId>> {
        match payload_ids(forest).first() {
            Some(&id) => Ok(Some(locate_section(self.store.as_ref(), id)?)),
            None => Ok(None),
        }
    }
}

fn payload_ids(forest: &[HierarchyNode]) -> Vec<SectionId> {
    let mut ids = Vec::new();
    let mut stack: Vec<&HierarchyNode> = forest.iter().rev().collect();
    while let Some(node) = stack.pop() {
        ids.push(node.id);
        stack.extend(node.children.iter().rev());
    }
    ids
}
