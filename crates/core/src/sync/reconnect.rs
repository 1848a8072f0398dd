//! Reconnect notification
//!
//! Payload-free publish/subscribe hook: the application (or a connectivity
//! monitor) calls [`ReconnectNotifier::notify`] when connectivity is likely
//! restored, and subscribers react with a drain pass.

use fieldsync_domain::constants::EVENT_CHANNEL_CAPACITY;
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ReconnectNotifier {
    tx: broadcast::Sender<()>,
}

impl ReconnectNotifier {
    /// Notifier with no subscribers
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Receive every reconnect signalled after this call
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger every subscriber; returns how many were listening
    pub fn notify(&self) -> usize {
        let receivers = self.tx.send(()).unwrap_or(0);
        debug!(receivers, "Reconnect trigger published");
        receivers
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ReconnectNotifier {
    fn default() -> Self {
        Self::new()
    }
}
