//! Test doubles shared by the FieldSync crates
//!
//! ```rust
//! use std::time::Duration;
//!
//! use fieldsync_common::testing::MockClock;
//! use fieldsync_common::time::Clock;
//!
//! let clock = MockClock::at_millis(1_000);
//! clock.advance(Duration::from_millis(250));
//! assert_eq!(clock.millis_since_epoch(), 1_250);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::time::Clock;

/// Clock that only moves when told to
///
/// Clones share the same reading, so a test can keep one handle and give
/// another to the code under test.
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    millis: Arc<AtomicU64>,
}

impl MockClock {
    /// Clock reading the epoch itself
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock reading `millis` since the epoch
    pub fn at_millis(millis: u64) -> Self {
        Self { millis: Arc::new(AtomicU64::new(millis)) }
    }

    /// Move the reading forward by `by`
    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.millis.fetch_add(by, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn millis_since_epoch(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}
