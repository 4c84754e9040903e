#[cfg(test)]
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

/// Auto-reset wake event.
///
/// Any number of `set` calls before a `wait` collapse into a single wake,
/// and a `wait` consumes the pending wake. Backed by a one-slot channel
/// whose both ends live here, so it never disconnects.
pub struct Signal {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl Signal {
    pub fn new(initially_set: bool) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(1);
        if initially_set {
            let _ = tx.try_send(());
        }
        Self { tx, rx }
    }

    pub fn set(&self) {
        // Full means a wake is already pending.
        let _ = self.tx.try_send(());
    }

    pub fn wait(&self) {
        let _ = self.rx.recv();
    }

    /// Returns `true` if woken, `false` on timeout.
    #[cfg(test)]
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> bool {
        self.rx.recv_timeout(timeout).is_ok()
    }

    /// Drop a pending wake without blocking.
    #[cfg(test)]
    pub(crate) fn reset(&self) {
        let _ = self.rx.try_recv();
    }
}
