//! Section numbering engine.
//!
//! Roots are numbered `{rank}.0`; a child of a section numbered `P` gets
//! `{base(P)}.{rank}`, where `base` strips a trailing `.0`. `rank` is the
//! 1-based position among siblings in `order_index` order, so gaps in
//! `order_index` never leak into numbers.

use std::collections::HashMap;

use generational_arena::Index;
use tracing::{debug, instrument};

use crate::domain::arena::{SectionArena, SectionShape};
use crate::domain::entities::Section;
use crate::domain::error::DomainResult;
use crate::domain::ids::SectionId;

/// Where a section sits in the numbered tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub level: u32,
    pub section_number: String,
    /// 1-based rank among siblings
    pub rank: u32,
}

/// Result of a numbering pass over one manual.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Numbering {
    placements: HashMap<SectionId, Placement>,
}

impl Numbering {
    pub fn get(&self, id: SectionId) -> Option<&Placement> {
        self.placements.get(&id)
    }

    pub fn number_of(&self, id: SectionId) -> Option<&str> {
        self.get(id).map(|p| p.section_number.as_str())
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Write levels and numbers into `sections`, returning the ids whose stored
    /// values were stale.
    pub fn apply_to<'a>(
        &self,
        sections: impl IntoIterator<Item = &'a mut Section>,
    ) -> Vec<SectionId> {
        let mut changed = Vec::new();
        for section in sections {
            if let Some(p) = self.placements.get(&section.id) {
                if section.level != p.level || section.section_number != p.section_number {
                    section.level = p.level;
                    section.section_number = p.section_number.clone();
                    changed.push(section.id);
                }
            }
        }
        changed
    }
}

/// Strip a trailing `.0` so children of `2.0` become `2.x`.
pub fn base_number(number: &str) -> &str {
    number.strip_suffix(".0").unwrap_or(number)
}

fn format_number(parent_number: Option<&str>, rank: u32) -> String {
    match parent_number {
        None => format!("{rank}.0"),
        Some(parent) => format!("{}.{rank}", base_number(parent)),
    }
}

/// Number the section that would be appended after `sibling_count` existing
/// siblings under `parent_number` (root level for `None`). Pure.
pub fn number_for_new_section(parent_number: Option<&str>, sibling_count: usize) -> String {
    format_number(parent_number, sibling_count as u32 + 1)
}

/// Compute level, number and rank for every section of one manual.
#[instrument(level = "debug", skip(shapes), fields(n = shapes.len()))]
pub fn compute_numbering(shapes: &[SectionShape]) -> DomainResult<Numbering> {
    let tree = SectionArena::build(shapes)?;
    Ok(number_arena(&tree))
}

/// Convenience over full rows.
pub fn compute_numbering_for<'a>(
    sections: impl IntoIterator<Item = &'a Section>,
) -> DomainResult<Numbering> {
    let shapes: Vec<SectionShape> = sections.into_iter().map(SectionShape::from).collect();
    compute_numbering(&shapes)
}

/// Depth-first numbering pass over an already validated arena.
pub fn number_arena(tree: &SectionArena) -> Numbering {
    let mut placements = HashMap::with_capacity(tree.len());
    // (node, parent number, level, rank)
    let mut stack: Vec<(Index, Option<String>, u32, u32)> = tree
        .roots()
        .iter()
        .enumerate()
        .rev()
        .map(|(i, &idx)| (idx, None, 0, i as u32 + 1))
        .collect();

    while let Some((idx, parent_number, level, rank)) = stack.pop() {
        let Some(node) = tree.get_node(idx) else {
            continue;
        };
        let number = format_number(parent_number.as_deref(), rank);
        for (i, &child) in node.children.iter().enumerate().rev() {
            stack.push((child, Some(number.clone()), level + 1, i as u32 + 1));
        }
        placements.insert(
            node.id,
            Placement {
                level,
                section_number: number,
                rank,
            },
        );
    }

    debug!("numbered {} sections", placements.len());
    Numbering { placements }
}
