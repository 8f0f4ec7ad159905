//! Trailing debounce as an explicit scheduled-task handle.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Runs an action once a quiescence window passes with no new schedule call.
///
/// Each [`reschedule`](Debouncer::reschedule) cancels the pending timer and
/// starts a new one. Only the timer is cancellable: once the window elapses
/// the action runs on its own task, so a later reschedule never aborts a
/// write that is already in flight.
pub struct Debouncer {
    window: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Cancels any pending timer and schedules `action` after the window.
    pub fn reschedule<F, Fut>(&mut self, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let window = self.window;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            tokio::spawn(action());
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Whether a timer is armed and has not fired yet.
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
