//! Two-phase mutation state
//!
//! A caller applies a mutation to local state first, then asks the core to
//! apply it remotely. The mutation stays `Pending` until the remote side
//! acknowledges it, either inline or through the job that carried it.

use serde::{Deserialize, Serialize};

/// Lifecycle of one optimistic local mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationState {
    /// Applied locally, awaiting remote acknowledgment
    Pending,
    /// Remote store acknowledged the change
    Confirmed,
    /// The carrying job exhausted its retries or failed permanently
    Failed,
}

crate::impl_domain_status_conversions!(MutationState {
    Pending => "pending",
    Confirmed => "confirmed",
    Failed => "failed",
});

impl MutationState {
    /// Whether `self -> next` is a legal step of the state machine
    ///
    /// `Confirmed` is final. `Failed` may only reopen to `Pending` through a
    /// user retry.
    pub fn can_transition_to(self, next: MutationState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed)
                | (Self::Pending, Self::Failed)
                | (Self::Failed, Self::Pending)
        )
    }

    pub fn is_settled(self) -> bool {
        !matches!(self, Self::Pending)
    }
}
