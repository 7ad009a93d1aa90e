//! Application layer: services and use cases
//!
//! This layer orchestrates domain planning and commits the result through the
//! store boundary trait.

pub mod error;
pub mod services;

pub use error::{ApplicationError, ApplicationResult, ErrorKind};
