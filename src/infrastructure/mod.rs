//! Infrastructure layer: store implementations, audit sinks and DI container
//!
//! This layer implements the storage and audit boundary traits and wires up services.

pub mod audit;
pub mod di;
pub mod error;
pub mod file_store;
pub mod memory;
pub mod tables;
pub mod traits;

pub use error::{AuditError, InfraError, InfraResult, StoreError, StoreResult};
