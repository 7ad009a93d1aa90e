//! Domain layer: entities and tree algorithms
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod cascade;
pub mod changes;
pub mod entities;
pub mod error;
pub mod forest;
pub mod ids;
pub mod invariants;
pub mod numbering;
pub mod planner;

pub use arena::{SectionArena, SectionNode, SectionShape};
pub use cascade::{plan_policy_removal, plan_section_removal, DeletionReport};
pub use changes::Write;
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use forest::{HierarchyNode, OrderedForest, SectionListing, SectionTree};
pub use ids::*;
pub use invariants::{check_invariants, Violation};
pub use numbering::{compute_numbering, number_for_new_section, Numbering, Placement};
pub use planner::MovePlan;
