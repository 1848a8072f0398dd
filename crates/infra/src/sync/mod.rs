//! Background synchronization services
//!
//! - [`ConnectivityMonitor`]: turns network status changes into reconnect
//!   triggers
//! - [`DrainWorker`]: drains the job queue on reconnect and on an interval
//!
//! Workers have explicit lifecycle management, join handle tracking, and
//! cancellation support.

pub mod connectivity;
pub mod drain_worker;
mod errors;

pub use connectivity::{ConnectivityMonitor, NetworkStatus};
pub use drain_worker::DrainWorker;
pub use errors::WorkerError;
