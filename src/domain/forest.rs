//! Nested views of a manual: the bulk-reorder payload and the assembled hierarchy.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use termtree::Tree;

use crate::domain::arena::SectionArena;
use crate::domain::entities::{ManualSnapshot, Policy, Section};
use crate::domain::error::DomainResult;
use crate::domain::ids::SectionId;

/// One node of a client-submitted ordering snapshot.
///
/// Extra fields sent by a tree widget (titles, numbers) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub id: SectionId,
    #[serde(default)]
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    pub fn leaf(id: SectionId) -> Self {
        Self {
            id,
            children: Vec::new(),
        }
    }

    pub fn with_children(id: SectionId, children: Vec<HierarchyNode>) -> Self {
        Self { id, children }
    }
}

/// Ordered list of root nodes, each carrying its ordered children.
pub type OrderedForest = Vec<HierarchyNode>;

/// A section with the policies it owns, for flat listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionListing {
    #[serde(flatten)]
    pub section: Section,
    pub policies: Vec<Policy>,
}

/// A section with its policies and nested children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionTree {
    #[serde(flatten)]
    pub section: Section,
    pub policies: Vec<Policy>,
    pub children: Vec<SectionTree>,
}

impl SectionTree {
    /// Render as an indented outline.
    pub fn to_tree_string(&self) -> Tree<String> {
        let label = format!("{} {}", self.section.section_number, self.section.title);
        let mut tree = Tree::new(label);
        for policy in &self.policies {
            tree.push(Tree::new(format!("[policy {}] {}", policy.id, policy.title)));
        }
        for child in &self.children {
            tree.push(child.to_tree_string());
        }
        tree
    }

    /// The payload that would reproduce this subtree's current ordering.
    pub fn to_payload(&self) -> HierarchyNode {
        HierarchyNode::with_children(
            self.section.id,
            self.children.iter().map(SectionTree::to_payload).collect(),
        )
    }
}

/// Flat listing ordered by `(level, order_index)`.
pub fn list_sections(snapshot: &ManualSnapshot) -> Vec<SectionListing> {
    snapshot
        .sections_by_level()
        .into_iter()
        .map(|section| SectionListing {
            section: section.clone(),
            policies: snapshot.policies_of(section.id).into_iter().cloned().collect(),
        })
        .collect()
}

/// Assemble the nested forest from the flat rows of a manual.
///
/// Built bottom-up from a post-order walk, so depth is not bounded by the
/// call stack.
pub fn assemble_hierarchy(snapshot: &ManualSnapshot) -> DomainResult<Vec<SectionTree>> {
    let tree = SectionArena::from_sections(snapshot.sections.values())?;
    let mut built: HashMap<SectionId, SectionTree> = HashMap::with_capacity(tree.len());
    let mut forest = Vec::with_capacity(tree.roots().len());

    for &root in tree.roots() {
        let Some(root_node) = tree.get_node(root) else {
            continue;
        };
        for (_, node) in tree.iter_postorder(root_node.id) {
            let children = node
                .children
                .iter()
                .filter_map(|&idx| tree.get_node(idx))
                .filter_map(|child| built.remove(&child.id))
                .collect();
            let section = snapshot.section(node.id)?.clone();
            let policies = snapshot.policies_of(node.id).into_iter().cloned().collect();
            built.insert(
                node.id,
                SectionTree {
                    section,
                    policies,
                    children,
                },
            );
        }
        if let Some(done) = built.remove(&root_node.id) {
            forest.push(done);
        }
    }
    Ok(forest)
}

/// Render a whole manual; an empty manual renders a single placeholder line.
pub fn render_forest(title: &str, forest: &[SectionTree]) -> Tree<String> {
    let mut tree = Tree::new(title.to_string());
    if forest.is_empty() {
        tree.push(Tree::new("(no sections)".to_string()));
    }
    for root in forest {
        tree.push(root.to_tree_string());
    }
    tree
}
