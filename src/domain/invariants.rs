//! Consistency check of a stored manual against the tree rules.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::domain::entities::ManualSnapshot;
use crate::domain::ids::SectionId;
use crate::domain::numbering::compute_numbering_for;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// Sibling `order_index` values are not exactly `0..k`
    NonContiguousSiblings {
        parent: Option<SectionId>,
        order_indices: Vec<u32>,
    },
    StaleLevel {
        section: SectionId,
        stored: u32,
        expected: u32,
    },
    StaleNumber {
        section: SectionId,
        stored: String,
        expected: String,
    },
    CrossManualParent {
        section: SectionId,
        parent: SectionId,
    },
    CorruptTree {
        message: String,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::NonContiguousSiblings {
                parent,
                order_indices,
            } => {
                let parent = parent.map_or_else(|| "root".to_string(), |p| p.to_string());
                write!(f, "children of {parent} have order indices {order_indices:?}")
            }
            Violation::StaleLevel {
                section,
                stored,
                expected,
            } => write!(f, "section {section} has level {stored}, expected {expected}"),
            Violation::StaleNumber {
                section,
                stored,
                expected,
            } => write!(f, "section {section} is numbered {stored}, expected {expected}"),
            Violation::CrossManualParent { section, parent } => {
                write!(f, "section {section} has parent {parent} from another manual")
            }
            Violation::CorruptTree { message } => write!(f, "{message}"),
        }
    }
}

/// Report every broken invariant. An empty result means the manual is consistent.
pub fn check_invariants(snapshot: &ManualSnapshot) -> Vec<Violation> {
    let mut violations = Vec::new();

    for section in snapshot.sections.values() {
        if let Some(parent) = section.parent_section_id {
            if let Some(p) = snapshot.sections.get(&parent) {
                if p.manual_id != section.manual_id {
                    violations.push(Violation::CrossManualParent {
                        section: section.id,
                        parent,
                    });
                }
            }
        }
    }

    let mut groups: BTreeMap<Option<SectionId>, Vec<u32>> = BTreeMap::new();
    for section in snapshot.sections.values() {
        groups
            .entry(section.parent_section_id)
            .or_default()
            .push(section.order_index);
    }
    for (parent, mut order_indices) in groups {
        order_indices.sort_unstable();
        let contiguous = order_indices
            .iter()
            .enumerate()
            .all(|(i, &order)| order == i as u32);
        if !contiguous {
            violations.push(Violation::NonContiguousSiblings {
                parent,
                order_indices,
            });
        }
    }

    match compute_numbering_for(snapshot.sections.values()) {
        Ok(numbering) => {
            for section in snapshot.sections.values() {
                let Some(expected) = numbering.get(section.id) else {
                    continue;
                };
                if section.level != expected.level {
                    violations.push(Violation::StaleLevel {
                        section: section.id,
                        stored: section.level,
                        expected: expected.level,
                    });
                }
                if section.section_number != expected.section_number {
                    violations.push(Violation::StaleNumber {
                        section: section.id,
                        stored: section.section_number.clone(),
                        expected: expected.section_number.clone(),
                    });
                }
            }
        }
        Err(e) => violations.push(Violation::CorruptTree {
            message: e.to_string(),
        }),
    }

    violations
}
