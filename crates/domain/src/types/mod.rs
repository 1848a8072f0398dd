//! Domain types and models

pub mod health;
pub mod job;
pub mod mutation;

pub use health::SyncHealthSnapshot;
pub use job::{Job, JobId, JobStatus};
pub use mutation::MutationState;
