//! Coalescing wake signal between the reconciler and the drain worker.
//!
//! A single-slot channel: notifying while a wake is already pending is a
//! no-op. The drain worker re-checks the queue until it is empty, so a
//! coalesced wake never loses work.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Sending half, held by the controller.
#[derive(Debug, Clone)]
pub struct WakeSignal {
    tx: mpsc::Sender<()>,
}

/// Receiving half, owned by the drain worker.
#[derive(Debug)]
pub struct WakeReceiver {
    rx: mpsc::Receiver<()>,
}

/// Creates a connected wake signal pair.
pub fn wake_signal() -> (WakeSignal, WakeReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (WakeSignal { tx }, WakeReceiver { rx })
}

impl WakeSignal {
    /// Requests a drain pass without blocking.
    ///
    /// Returns `true` if a new wake was queued, `false` if one was already
    /// pending or the worker is gone.
    pub fn notify(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) | Err(TrySendError::Closed(())) => false,
        }
    }
}

impl WakeReceiver {
    /// Waits for the next wake. Returns `None` once every sender is dropped.
    pub async fn recv(&mut self) -> Option<()> {
        self.rx.recv().await
    }

    /// Closes the channel; later notifications are dropped.
    pub fn close(&mut self) {
        self.rx.close();
    }
}
