//! # Tabula Domain
//!
//! Domain types for the Tabula warehouse client.
//!
//! This crate contains:
//! - Resource references (project, dataset, table, job)
//! - The job model (configuration, status, state)
//! - Error types (`TabulaError`, `ApiError`, `Reason`) and Result definitions
//! - Configuration structures and defaults
//! - Listing pages and table data shapes
//!
//! ## Architecture
//! - No dependencies on other Tabula crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
