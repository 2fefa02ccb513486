//! A wakeable cooperative-cancellation signal for the governor's tick loop.
//!
//! A plain `AtomicBool` would make the inter-tick wait busy-wait; pairing it
//! with a [`tokio::sync::Notify`] lets `stop()` wake the sleeping loop
//! immediately instead of waiting out the rest of the tick interval.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

/// Shared stop signal for one worker loop.
#[derive(Clone)]
pub struct StopSignal {
    inner: Arc<Inner>,
}

struct Inner {
    running: AtomicBool,
    notify: Notify,
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl StopSignal {
    /// Construct a signal in the running state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                running: AtomicBool::new(true),
                notify: Notify::new(),
            }),
        }
    }

    /// Whether the loop should keep iterating.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Request the loop to stop and wake it if it is currently sleeping.
    pub fn stop(&self) {
        self.inner.running.store(false, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Sleep for `duration`, waking early if [`Self::stop`] is called.
    /// Returns `true` if the full duration elapsed, `false` if woken early.
    pub async fn wait(&self, duration: Duration) -> bool {
        tokio::select! {
            () = tokio::time::sleep(duration) => true,
            () = self.inner.notify.notified() => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stop_wakes_a_pending_wait_immediately() {
        let signal = StopSignal::new();
        let waiter = signal.clone();
        let handle = tokio::spawn(async move { waiter.wait(Duration::from_secs(3600)).await });

        tokio::task::yield_now().await;
        signal.stop();

        let completed_full_duration = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("stop should wake the waiter well within the test timeout")
            .expect("task should not panic");
        assert!(!completed_full_duration);
    }

    #[test]
    fn starts_running() {
        let signal = StopSignal::new();
        assert!(signal.is_running());
    }

    #[test]
    fn stop_clears_running_flag() {
        let signal = StopSignal::new();
        signal.stop();
        assert!(!signal.is_running());
    }
}
