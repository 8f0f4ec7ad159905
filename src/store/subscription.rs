//! Live collection subscriptions as cancellable streams.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use super::ChangeEvent;

type CancelFn = Box<dyn FnOnce() + Send>;

struct CancelState {
    cancelled: AtomicBool,
    on_cancel: Mutex<Option<CancelFn>>,
}

/// Detachable handle that cancels a [`Subscription`] from outside its stream.
///
/// Cancellation is synchronous: once `cancel` returns, the driver has dropped
/// the listener and the stream yields `None`. Calling it again does nothing.
#[derive(Clone)]
pub struct CancelHandle {
    state: Arc<CancelState>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        if self.state.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        let hook = self
            .state
            .on_cancel
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(hook) = hook {
            hook();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }
}

/// A lazy, unbounded stream of change batches for one collection.
///
/// Restart by subscribing again. Dropping the subscription cancels it.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Vec<ChangeEvent>>,
    handle: CancelHandle,
}

impl Subscription {
    /// Wraps a driver channel; `on_cancel` runs exactly once when the
    /// subscription is cancelled or dropped.
    pub fn new(
        rx: mpsc::UnboundedReceiver<Vec<ChangeEvent>>,
        on_cancel: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            rx,
            handle: CancelHandle {
                state: Arc::new(CancelState {
                    cancelled: AtomicBool::new(false),
                    on_cancel: Mutex::new(Some(Box::new(on_cancel))),
                }),
            },
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.handle.clone()
    }

    pub fn cancel(&mut self) {
        self.handle.cancel();
        self.rx.close();
    }

    pub fn is_cancelled(&self) -> bool {
        self.handle.is_cancelled()
    }
}

impl Stream for Subscription {
    type Item = Vec<ChangeEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.handle.is_cancelled() {
            return Poll::Ready(None);
        }
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.cancel();
    }
}
