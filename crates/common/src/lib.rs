//! Modular common utilities shared across FieldSync crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: executor failure taxonomy, classification and conversion
//!   macros
//! - `runtime`: wall-clock abstraction used by the sync core
//! - `test-utils`: controllable clock for tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(any(feature = "foundation", test))]
pub mod error;

// Runtime tier
// -----------------------------------------------------------------
#[cfg(any(feature = "runtime", test))]
pub mod time;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", test))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(any(feature = "foundation", test))]
pub use error::{CommonError, CommonResult, ErrorClassification, ErrorSeverity};
#[cfg(any(feature = "runtime", test))]
pub use time::{Clock, SystemClock};
