//! Wall-clock abstraction
//!
//! The queue stamps `created_at` and `last_attempt` as milliseconds since the
//! UNIX epoch. Going through [`Clock`] lets tests pin those stamps.

use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock timestamps
pub trait Clock: Send + Sync {
    /// Milliseconds since the UNIX epoch
    fn millis_since_epoch(&self) -> u64;
}

/// The real system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn millis_since_epoch(&self) -> u64 {
        // A clock set before 1970 reads as the epoch itself
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}
