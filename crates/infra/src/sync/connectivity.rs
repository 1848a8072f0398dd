//! Connectivity tracking
//!
//! The platform layer reports network changes here. Only a transition into
//! [`NetworkStatus::Online`] publishes a reconnect trigger; repeated online
//! reports are ignored.

use fieldsync_core::ReconnectNotifier;
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NetworkStatus {
    Online,
    Offline,
    #[default]
    Unknown,
}

fieldsync_domain::impl_domain_status_conversions!(NetworkStatus {
    Online => "online",
    Offline => "offline",
    Unknown => "unknown",
});

/// Tracks online status and signals reconnects on an offline to online edge
pub struct ConnectivityMonitor {
    tx: watch::Sender<NetworkStatus>,
    reconnect: ReconnectNotifier,
}

impl ConnectivityMonitor {
    pub fn new(reconnect: ReconnectNotifier) -> Self {
        let (tx, _rx) = watch::channel(NetworkStatus::Unknown);
        Self { tx, reconnect }
    }

    pub fn status(&self) -> NetworkStatus {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<NetworkStatus> {
        self.tx.subscribe()
    }

    /// Record `status`; returns `true` if a reconnect trigger was published
    pub fn set_status(&self, status: NetworkStatus) -> bool {
        let previous = self.tx.send_replace(status);
        if previous == status {
            return false;
        }

        debug!(%previous, current = %status, "Network status changed");
        if status == NetworkStatus::Online {
            let receivers = self.reconnect.notify();
            info!(%previous, receivers, "Connectivity restored");
            return true;
        }
        false
    }

    pub fn set_online(&self) -> bool {
        self.set_status(NetworkStatus::Online)
    }

    pub fn set_offline(&self) -> bool {
        self.set_status(NetworkStatus::Offline)
    }
}
