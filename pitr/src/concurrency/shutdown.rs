//! Cooperative shutdown signaling for a running recovery.
//!
//! Abstracts a tokio watch channel into a pair of handles: the transmitter
//! requests cancellation, receivers observe it between records. All
//! receivers see the same request, so one signal stops every map worker and
//! the reduce loop alike.

use tokio::sync::watch;

/// Transmitter side of the shutdown channel.
#[derive(Debug, Clone)]
pub struct ShutdownTx(watch::Sender<bool>);

/// Receiver side of the shutdown channel.
#[derive(Debug, Clone)]
pub struct ShutdownRx(watch::Receiver<bool>);

/// Creates a shutdown channel in the "running" state.
pub fn create_shutdown() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTx(tx), ShutdownRx(rx))
}

impl ShutdownTx {
    /// Creates a new receiver observing this transmitter.
    pub fn subscribe(&self) -> ShutdownRx {
        ShutdownRx(self.0.subscribe())
    }

    /// Requests cancellation of the run.
    ///
    /// The request is stored in the channel even when no receiver exists
    /// yet, so workers subscribing later still observe it. Returns whether
    /// any receiver is currently listening; a finished run has dropped its
    /// receivers.
    pub fn shutdown(&self) -> bool {
        self.0.send_replace(true);
        self.0.receiver_count() > 0
    }
}

impl ShutdownRx {
    /// Whether cancellation has been requested.
    pub fn is_requested(&self) -> bool {
        *self.0.borrow()
    }

    /// Waits until cancellation is requested.
    ///
    /// Resolves immediately when the transmitter is gone, since without a
    /// transmitter no further work can be coordinated anyway.
    pub async fn requested(&mut self) {
        let _ = self.0.wait_for(|requested| *requested).await;
    }
}
