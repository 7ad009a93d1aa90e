//! sectree: numbered section hierarchies for policy manuals
//!
//! Layers, innermost first:
//! - `domain`: entities, numbering, move/reorder/cascade planning (no I/O)
//! - `application`: services that load a manual, plan, and commit atomically
//! - `infrastructure`: stores, audit sinks and the service container
//! - `cli`: argument parsing and command dispatch

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
