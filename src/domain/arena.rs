//! Arena-based forest of sections.
//!
//! Sections are persisted as an adjacency list (`parent_section_id`,
//! `order_index`). Algorithms that need the tree shape build a `SectionArena`
//! from a flat slice; parent/child links are resolved through an id map, so no
//! node holds a live reference to another.

use std::collections::{HashMap, HashSet};

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::entities::Section;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::ids::SectionId;

/// The part of a section that determines its place in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionShape {
    pub id: SectionId,
    pub parent: Option<SectionId>,
    pub order_index: u32,
}

impl From<&Section> for SectionShape {
    fn from(section: &Section) -> Self {
        Self {
            id: section.id,
            parent: section.parent_section_id,
            order_index: section.order_index,
        }
    }
}

/// Tree node in the arena.
#[derive(Debug)]
pub struct SectionNode {
    pub id: SectionId,
    /// Index of parent node in the arena, None for root sections
    pub parent: Option<Index>,
    /// Indices of child nodes in sibling order
    pub children: Vec<Index>,
}

/// Ordered forest of the sections of one manual.
///
/// Siblings are ordered by `order_index`; ties keep input order.
#[derive(Debug, Default)]
pub struct SectionArena {
    arena: Arena<SectionNode>,
    roots: Vec<Index>,
    by_id: HashMap<SectionId, Index>,
}

impl SectionArena {
    /// Build the forest from a flat list.
    ///
    /// Fails with `CorruptTree` on duplicate ids, dangling parents, and parent
    /// chains that never reach a root.
    #[instrument(level = "debug", skip(shapes), fields(n = shapes.len()))]
    pub fn build(shapes: &[SectionShape]) -> DomainResult<Self> {
        let mut arena = Arena::with_capacity(shapes.len());
        let mut by_id = HashMap::with_capacity(shapes.len());

        for shape in shapes {
            let idx = arena.insert(SectionNode {
                id: shape.id,
                parent: None,
                children: Vec::new(),
            });
            if by_id.insert(shape.id, idx).is_some() {
                return Err(DomainError::corrupt(shape.id, "duplicate section id"));
            }
        }

        // (order_index, input position, node)
        let mut roots: Vec<(u32, usize, Index)> = Vec::new();
        let mut children: HashMap<Index, Vec<(u32, usize, Index)>> = HashMap::new();
        for (pos, shape) in shapes.iter().enumerate() {
            let idx = by_id[&shape.id];
            match shape.parent {
                None => roots.push((shape.order_index, pos, idx)),
                Some(parent_id) => {
                    let parent_idx = by_id.get(&parent_id).copied().ok_or_else(|| {
                        DomainError::corrupt(
                            shape.id,
                            format!("parent section {parent_id} does not exist"),
                        )
                    })?;
                    if let Some(node) = arena.get_mut(idx) {
                        node.parent = Some(parent_idx);
                    }
                    children
                        .entry(parent_idx)
                        .or_default()
                        .push((shape.order_index, pos, idx));
                }
            }
        }

        roots.sort_unstable_by_key(|&(order, pos, _)| (order, pos));
        for (parent_idx, mut kids) in children {
            kids.sort_unstable_by_key(|&(order, pos, _)| (order, pos));
            if let Some(parent) = arena.get_mut(parent_idx) {
                parent.children = kids.into_iter().map(|(_, _, idx)| idx).collect();
            }
        }

        let tree = Self {
            arena,
            roots: roots.into_iter().map(|(_, _, idx)| idx).collect(),
            by_id,
        };
        tree.check_reachable(shapes)?;
        Ok(tree)
    }

    /// Build from full section rows.
    pub fn from_sections<'a>(sections: impl IntoIterator<Item = &'a Section>) -> DomainResult<Self> {
        let shapes: Vec<SectionShape> = sections.into_iter().map(SectionShape::from).collect();
        Self::build(&shapes)
    }

    /// Every section must be reachable from a root; anything else sits on a cycle.
    fn check_reachable(&self, shapes: &[SectionShape]) -> DomainResult<()> {
        let mut seen = HashSet::with_capacity(self.arena.len());
        for (_, node) in self.iter() {
            if !seen.insert(node.id) {
                return Err(DomainError::corrupt(node.id, "section visited twice"));
            }
        }
        if seen.len() != self.arena.len() {
            let stranded = shapes
                .iter()
                .find(|s| !seen.contains(&s.id))
                .map(|s| s.id)
                .unwrap_or_default();
            return Err(DomainError::corrupt(stranded, "parent chain contains a cycle"));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn contains(&self, id: SectionId) -> bool {
        self.by_id.contains_key(&id)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn get_node(&self, idx: Index) -> Option<&SectionNode> {
        self.arena.get(idx)
    }

    pub fn index_of(&self, id: SectionId) -> Option<Index> {
        self.by_id.get(&id).copied()
    }

    pub fn node(&self, id: SectionId) -> Option<&SectionNode> {
        self.index_of(id).and_then(|idx| self.arena.get(idx))
    }

    pub fn roots(&self) -> &[Index] {
        &self.roots
    }

    /// Ids of the direct children of `parent` (roots for `None`) in order.
    pub fn child_ids(&self, parent: Option<SectionId>) -> Vec<SectionId> {
        let indices: &[Index] = match parent {
            None => &self.roots,
            Some(id) => match self.node(id) {
                Some(node) => &node.children,
                None => return Vec::new(),
            },
        };
        indices
            .iter()
            .filter_map(|&idx| self.arena.get(idx))
            .map(|n| n.id)
            .collect()
    }

    /// Pre-order over the whole forest, roots in order.
    #[instrument(level = "trace", skip(self))]
    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self, self.roots.clone())
    }

    /// Post-order over the subtree rooted at `id` (children before parents).
    #[instrument(level = "trace", skip(self))]
    pub fn iter_postorder(&self, id: SectionId) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self, self.index_of(id))
    }

    /// Ids of every descendant of `id`, pre-order, excluding `id` itself.
    pub fn descendants(&self, id: SectionId) -> Vec<SectionId> {
        match self.index_of(id) {
            Some(idx) => TreeIterator::new(self, vec![idx])
                .skip(1)
                .map(|(_, n)| n.id)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Ancestor chain of `id`, nearest parent first.
    pub fn ancestors(&self, id: SectionId) -> Vec<SectionId> {
        let mut chain = Vec::new();
        let mut current = self.node(id).and_then(|n| n.parent);
        while let Some(idx) = current {
            match self.arena.get(idx) {
                Some(node) => {
                    chain.push(node.id);
                    current = node.parent;
                }
                None => break,
            }
        }
        chain
    }

    /// Number of levels in the deepest branch, 0 for an empty forest.
    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        self.roots
            .iter()
            .map(|&root| self.calculate_depth(root))
            .max()
            .unwrap_or(0)
    }

    fn calculate_depth(&self, node_idx: Index) -> usize {
        // iterative: depth of a tree is bounded by its size, not the stack
        let mut max = 0;
        let mut stack = vec![(node_idx, 1usize)];
        while let Some((idx, depth)) = stack.pop() {
            if let Some(node) = self.arena.get(idx) {
                max = max.max(depth);
                stack.extend(node.children.iter().map(|&c| (c, depth + 1)));
            }
        }
        max
    }
}

pub struct TreeIterator<'a> {
    arena: &'a SectionArena,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(arena: &'a SectionArena, mut start: Vec<Index>) -> Self {
        start.reverse();
        Self {
            arena,
            stack: start,
        }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a SectionNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a> {
    arena: &'a SectionArena,
    stack: Vec<(Index, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(arena: &'a SectionArena, start: Option<Index>) -> Self {
        Self {
            arena,
            stack: start.map(|idx| vec![(idx, false)]).unwrap_or_default(),
        }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (Index, &'a SectionNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current_idx, visited)) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                if !visited {
                    self.stack.push((current_idx, true));
                    for &child in node.children.iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some((current_idx, node));
                }
            }
        }
        None
    }
}
