//! Structural mutation planning.
//!
//! Every plan works on a copy of a manual's sections, validates before touching
//! anything, then derives levels and numbers for the whole manual and emits a
//! `PutSection` for each row that differs from the snapshot.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::domain::changes::Write;
use crate::domain::entities::{ManualSnapshot, NewSection, Section};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::forest::HierarchyNode;
use crate::domain::ids::{SectionId, UserId};
use crate::domain::numbering::{compute_numbering_for, number_for_new_section};

type SectionTable = BTreeMap<SectionId, Section>;

/// Outcome of planning a single-section move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePlan {
    pub writes: Vec<Write>,
    pub from_parent: Option<SectionId>,
    pub to_parent: Option<SectionId>,
    /// Slot actually used after clamping to the destination list
    pub order_index: u32,
    pub old_number: String,
    pub new_number: String,
}

/// Build the row for a new section appended after its future siblings.
pub fn plan_create(
    snapshot: &ManualSnapshot,
    new: &NewSection,
    id: SectionId,
    actor: Option<&UserId>,
    now: DateTime<Utc>,
) -> DomainResult<Section> {
    new.validate()?;
    let (parent_number, level) = match new.parent_section_id {
        None => (None, 0),
        Some(parent_id) => {
            let parent = snapshot.section(parent_id)?;
            (Some(parent.section_number.as_str()), parent.level + 1)
        }
    };
    let siblings = snapshot.children_of(new.parent_section_id);
    let order_index = siblings
        .iter()
        .map(|s| s.order_index + 1)
        .max()
        .unwrap_or(0)
        .max(siblings.len() as u32);

    Ok(Section {
        id,
        manual_id: snapshot.manual_id,
        parent_section_id: new.parent_section_id,
        level,
        section_number: number_for_new_section(parent_number, siblings.len()),
        order_index,
        title: new.title.trim().to_string(),
        description: new.description.clone(),
        is_collapsed: false,
        created_by_id: actor.cloned(),
        created_at: now,
        updated_at: now,
    })
}

/// Reject a parent that is the section itself or one of its descendants.
///
/// Walks the ancestor chain of `new_parent` towards the root.
pub fn check_no_cycle(
    sections: &SectionTable,
    section_id: SectionId,
    new_parent: SectionId,
) -> DomainResult<()> {
    if new_parent == section_id {
        return Err(DomainError::invalid_move(
            section_id,
            "cannot make a section its own parent",
        ));
    }
    let mut visited = HashSet::new();
    let mut current = Some(new_parent);
    while let Some(id) = current {
        if !visited.insert(id) {
            return Err(DomainError::corrupt(id, "ancestor chain revisits a section"));
        }
        if id == section_id {
            return Err(DomainError::invalid_move(
                section_id,
                "cannot nest a section under its own subsection",
            ));
        }
        current = sections
            .get(&id)
            .ok_or(DomainError::SectionNotFound(id))?
            .parent_section_id;
    }
    Ok(())
}

/// Children of `parent` in the working table, sibling order, optionally skipping one.
fn sibling_ids(sections: &SectionTable, parent: Option<SectionId>, skip: Option<SectionId>) -> Vec<SectionId> {
    sections
        .values()
        .filter(|s| s.parent_section_id == parent && Some(s.id) != skip)
        .sorted_by_key(|s| (s.order_index, s.id))
        .map(|s| s.id)
        .collect()
}

fn assign_order(sections: &mut SectionTable, ordered: &[SectionId]) {
    for (i, id) in ordered.iter().enumerate() {
        if let Some(s) = sections.get_mut(id) {
            s.order_index = i as u32;
        }
    }
}

/// Derive levels and numbers for the working table and diff against `original`.
fn finalize(
    original: &SectionTable,
    mut working: SectionTable,
    now: DateTime<Utc>,
) -> DomainResult<Vec<Write>> {
    let numbering = compute_numbering_for(working.values())?;
    numbering.apply_to(working.values_mut());

    let writes: Vec<Write> = working
        .into_values()
        .filter(|s| match original.get(&s.id) {
            Some(before) => {
                before.parent_section_id != s.parent_section_id
                    || before.order_index != s.order_index
                    || before.level != s.level
                    || before.section_number != s.section_number
            }
            None => true,
        })
        .map(|mut s| {
            s.updated_at = now;
            Write::PutSection(s)
        })
        .collect();
    debug!("finalize: {} sections changed", writes.len());
    Ok(writes)
}

/// Plan moving `section_id` under `new_parent` (root level for `None`) at slot
/// `new_order_index`.
///
/// The section leaves its old sibling list (which closes up) and is inserted
/// into the destination list; siblings at or after the slot shift by one. A
/// slot past the end appends. Levels and numbers are re-derived for the whole
/// manual, which re-levels the entire moved subtree.
#[instrument(level = "debug", skip(snapshot, now))]
pub fn plan_move(
    snapshot: &ManualSnapshot,
    section_id: SectionId,
    new_parent: Option<SectionId>,
    new_order_index: u32,
    now: DateTime<Utc>,
) -> DomainResult<MovePlan> {
    let moving = snapshot.section(section_id)?;
    if let Some(parent_id) = new_parent {
        let parent = snapshot.section(parent_id)?;
        if parent.manual_id != moving.manual_id {
            return Err(DomainError::invalid_move(
                section_id,
                format!("target parent {parent_id} belongs to another manual"),
            ));
        }
        check_no_cycle(&snapshot.sections, section_id, parent_id)?;
    }

    let from_parent = moving.parent_section_id;
    let old_number = moving.section_number.clone();
    let mut working = snapshot.sections.clone();

    if from_parent != new_parent {
        let remaining = sibling_ids(&working, from_parent, Some(section_id));
        assign_order(&mut working, &remaining);
    }

    let mut destination = sibling_ids(&working, new_parent, Some(section_id));
    let slot = (new_order_index as usize).min(destination.len());
    destination.insert(slot, section_id);
    if let Some(s) = working.get_mut(&section_id) {
        s.parent_section_id = new_parent;
    }
    assign_order(&mut working, &destination);

    let writes = finalize(&snapshot.sections, working, now)?;
    let new_number = writes
        .iter()
        .find_map(|w| match w {
            Write::PutSection(s) if s.id == section_id => Some(s.section_number.clone()),
            _ => None,
        })
        .unwrap_or_else(|| old_number.clone());

    Ok(MovePlan {
        writes,
        from_parent,
        to_parent: new_parent,
        order_index: slot as u32,
        old_number,
        new_number,
    })
}

/// Flattened payload entry.
struct Placed {
    id: SectionId,
    parent: Option<SectionId>,
    order_index: u32,
    lists_children: bool,
}

fn flatten_forest(forest: &[HierarchyNode]) -> DomainResult<Vec<Placed>> {
    let mut placed = Vec::new();
    let mut seen = HashSet::new();
    // explicit stack: (node, parent, position)
    let mut stack: Vec<(&HierarchyNode, Option<SectionId>, usize)> =
        forest.iter().enumerate().rev().map(|(i, n)| (n, None, i)).collect();

    while let Some((node, parent, position)) = stack.pop() {
        if !seen.insert(node.id) {
            return Err(DomainError::Validation(format!(
                "section {} appears more than once in the payload",
                node.id
            )));
        }
        placed.push(Placed {
            id: node.id,
            parent,
            order_index: position as u32,
            lists_children: !node.children.is_empty(),
        });
        for (i, child) in node.children.iter().enumerate().rev() {
            stack.push((child, Some(node.id), i));
        }
    }
    Ok(placed)
}

/// Plan applying a full ordering snapshot submitted by a tree view.
///
/// Payload nodes get their parent and position from the payload. Sections
/// missing from the payload keep their parent; that is only allowed where it
/// cannot silently drop them from an ordering: their parent is missing too, or
/// their parent is present with no listed children (a collapsed subtree).
#[instrument(level = "debug", skip_all, fields(roots = forest.len()))]
pub fn plan_hierarchy(
    snapshot: &ManualSnapshot,
    forest: &[HierarchyNode],
    now: DateTime<Utc>,
) -> DomainResult<Vec<Write>> {
    if forest.is_empty() {
        return Err(DomainError::Validation("hierarchy payload is empty".into()));
    }
    let placed = flatten_forest(forest)?;
    for p in &placed {
        snapshot.section(p.id)?;
    }

    let listed: HashMap<SectionId, bool> =
        placed.iter().map(|p| (p.id, p.lists_children)).collect();
    for section in snapshot.sections.values() {
        if listed.contains_key(&section.id) {
            continue;
        }
        match section.parent_section_id {
            None => {
                return Err(DomainError::Validation(format!(
                    "root section {} is missing from the payload",
                    section.id
                )))
            }
            Some(parent) if listed.get(&parent) == Some(&true) => {
                return Err(DomainError::Validation(format!(
                    "section {} under {} is missing from the payload",
                    section.id, parent
                )))
            }
            Some(_) => {}
        }
    }

    let mut working = snapshot.sections.clone();
    for p in &placed {
        if let Some(s) = working.get_mut(&p.id) {
            s.parent_section_id = p.parent;
            s.order_index = p.order_index;
        }
    }

    // groups made only of sections absent from the payload may have lost members
    let absent_parents: HashSet<Option<SectionId>> = working
        .values()
        .filter(|s| !listed.contains_key(&s.id))
        .map(|s| s.parent_section_id)
        .collect();
    for parent in absent_parents {
        let ordered = sibling_ids(&working, parent, None);
        assign_order(&mut working, &ordered);
    }

    finalize(&snapshot.sections, working, now)
}

/// Plan a repair pass: optionally close gaps in sibling order, then re-derive
/// levels and numbers everywhere.
pub fn plan_renumber(
    sections: &SectionTable,
    compact: bool,
    now: DateTime<Utc>,
) -> DomainResult<Vec<Write>> {
    let mut working = sections.clone();
    if compact {
        let parents: HashSet<Option<SectionId>> =
            working.values().map(|s| s.parent_section_id).collect();
        for parent in parents {
            let ordered = sibling_ids(&working, parent, None);
            assign_order(&mut working, &ordered);
        }
    }
    finalize(sections, working, now)
}
