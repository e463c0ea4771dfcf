//! Latching event flags used to interleave the two transactions of a scenario.
//!
//! A [`Signal`] starts clear, is set exactly once per run, and stays set:
//! waiting on an already-set signal returns immediately. Clones share state.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct Signal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

impl Signal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Latch the flag and wake every waiter. Setting twice is a no-op.
    pub fn set(&self) {
        self.tx.send_if_modified(|flag| {
            if *flag {
                false
            } else {
                *flag = true;
                true
            }
        });
    }

    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    /// Guard that sets the flag when dropped, so every exit path of the
    /// owning transaction releases its peer.
    pub fn set_on_drop(&self) -> SignalGuard {
        SignalGuard {
            signal: self.clone(),
        }
    }

    /// Wait until the flag is set.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|flag| *flag).await;
    }

    /// Wait up to `timeout`; returns whether the flag was set in time.
    pub async fn wait_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait()).await.is_ok()
    }
}

#[derive(Debug)]
#[must_use = "the signal is set when the guard is dropped"]
pub struct SignalGuard {
    signal: Signal,
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        self.signal.set();
    }
}

/// The two flags every scenario choreographs around.
///
/// `written` is owned by the writer (Tx1), `read` by the reader (Tx2).
#[derive(Debug, Clone, Default)]
pub struct Signals {
    pub written: Signal,
    pub read: Signal,
}

impl Signals {
    pub fn new() -> Self {
        Self::default()
    }
}
