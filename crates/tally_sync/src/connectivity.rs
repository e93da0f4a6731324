//! Connectivity oracle.
//!
//! Exposes the current online/offline state as a boolean and broadcasts
//! transitions over a watch channel. The platform's network stack feeds it;
//! the sync engine subscribes. Rapid flaps coalesce on the consumer side: a
//! transition observed while a drain is running is dropped, since the next
//! drain picks up anything enqueued in the meantime.

use tokio::sync::watch;

pub struct ConnectivityOracle {
    tx: watch::Sender<bool>,
}

impl ConnectivityOracle {
    pub fn new(initially_online: bool) -> Self {
        let (tx, _) = watch::channel(initially_online);
        Self { tx }
    }

    /// Report a connectivity change from the network stack.
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            tracing::info!(online, "connectivity changed");
        }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Subscribe to transitions; the receiver sees the latest state only.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
