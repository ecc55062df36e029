//! # FieldSync Domain
//!
//! Domain types for the offline mutation queue and its sync engine.
//!
//! This crate contains:
//! - Queued operations, sync results, stats and dataset kinds
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Persistence keys and engine defaults
//!
//! ## Architecture
//! - No dependencies on other FieldSync crates
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
