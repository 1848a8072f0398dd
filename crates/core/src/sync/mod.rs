//! Offline synchronization
//!
//! Components, leaves first:
//! - [`queue_store`]: durable job collection behind a single-writer lock
//! - [`registry`]: label to executor mapping
//! - [`health`]: process-wide sync health state
//! - [`orchestrator`]: inline attempts and sync activity instrumentation
//! - [`drain`]: single-flight queue drain loop
//! - [`service`]: the facade handed to the application

pub mod drain;
pub mod errors;
pub mod health;
pub mod mutations;
pub mod notifier;
pub mod orchestrator;
pub mod ports;
pub mod queue_store;
pub mod reconnect;
pub mod registry;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;
