//! # FieldSync Domain
//!
//! Domain types and models for the FieldSync offline synchronization core.
//!
//! This crate contains:
//! - The durable job record (`Job`, `JobId`, `JobStatus`)
//! - The sync health snapshot observed by the UI
//! - Two-phase mutation states
//! - Domain error types and Result definitions
//! - Configuration structures and constants
//!
//! ## Architecture
//! - No dependencies on other FieldSync crates
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
