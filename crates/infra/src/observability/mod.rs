//! Observability
//!
//! Structured logging setup on top of `tracing-subscriber`.

pub mod logging;

pub use logging::init_tracing;
