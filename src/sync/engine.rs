//! Sync Engine: debounced snapshot writer plus command-queue listener for the
//! current device identity.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::commands::CommandListener;
use super::debounce::Debouncer;
use super::snapshot::{SnapshotOutcome, SnapshotWriter};
use crate::browser::BrowserHost;
use crate::store::DocumentStore;
use crate::types::device::DeviceIdentity;
use crate::types::settings::SyncSettings;

struct Shared {
    store: Arc<dyn DocumentStore>,
    browser: Arc<dyn BrowserHost>,
    writer: SnapshotWriter,
    listener: Mutex<Option<CommandListener>>,
    /// Serializes subscribe attempts and identity switches. Never taken by
    /// `halt`, so teardown does not wait on an in-flight subscribe.
    subscribing: tokio::sync::Mutex<()>,
    debouncer: Mutex<Debouncer>,
    stopped: AtomicBool,
}

impl Shared {
    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn debouncer(&self) -> MutexGuard<'_, Debouncer> {
        self.debouncer.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn listener(&self) -> MutexGuard<'_, Option<CommandListener>> {
        self.listener.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn stop_listener(&self) {
        if let Some(old) = self.listener().take() {
            old.stop();
            info!(device_id = old.device_id(), "Stopped command listener");
        }
    }

    fn schedule_snapshot(self: &Arc<Self>) {
        let shared = Arc::clone(self);
        self.debouncer().reschedule(move || async move {
            shared.flush().await;
        });
    }

    /// Writes a snapshot, then makes sure commands are being listened for.
    async fn flush(&self) -> SnapshotOutcome {
        if self.is_stopped() {
            return SnapshotOutcome::Stopped;
        }
        let outcome = self.writer.write().await;
        if matches!(outcome, SnapshotOutcome::Written(_)) {
            self.ensure_listener().await;
        }
        outcome
    }

    /// Starts a command listener for the current identity if none is running.
    /// A failed subscribe is retried on the next successful flush.
    async fn ensure_listener(&self) {
        let _subscribing = self.subscribing.lock().await;
        let Some(identity) = self.writer.identity() else {
            return;
        };
        if self.is_stopped() {
            return;
        }
        {
            let mut slot = self.listener();
            if slot
                .as_ref()
                .is_some_and(|l| l.device_id() == identity.device_id && !l.is_stopped())
            {
                return;
            }
            if let Some(old) = slot.take() {
                old.stop();
            }
        }
        match CommandListener::start(
            Arc::clone(&self.store),
            Arc::clone(&self.browser),
            &identity.device_id,
        )
        .await
        {
            Ok(listener) => {
                // `halt` sets the flag before clearing the slot.
                let mut slot = self.listener();
                if self.is_stopped() {
                    listener.stop();
                } else {
                    *slot = Some(listener);
                }
            }
            Err(e) => {
                warn!(device_id = %identity.device_id, error = %e, "Failed to subscribe to command queue")
            }
        }
    }
}

/// Owns one store client and one browser host for the lifetime of a
/// configuration. Reconfiguring means dropping this engine and building a new
/// one.
pub struct SyncEngine {
    shared: Arc<Shared>,
    events_task: Option<JoinHandle<()>>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        browser: Arc<dyn BrowserHost>,
        settings: &SyncSettings,
    ) -> Self {
        let writer = SnapshotWriter::new(Arc::clone(&store), Arc::clone(&browser));
        Self {
            shared: Arc::new(Shared {
                store,
                browser,
                writer,
                listener: Mutex::new(None),
                subscribing: tokio::sync::Mutex::new(()),
                debouncer: Mutex::new(Debouncer::new(settings.debounce_window())),
                stopped: AtomicBool::new(false),
            }),
            events_task: None,
        }
    }

    /// Starts watching tab events and, if an identity is given, writes an
    /// immediate snapshot and opens the command listener.
    pub async fn start(&mut self, identity: Option<DeviceIdentity>) {
        self.shared.stopped.store(false, Ordering::SeqCst);
        if self.events_task.is_none() {
            let mut events = self.shared.browser.subscribe_events();
            let shared = Arc::clone(&self.shared);
            self.events_task = Some(tokio::spawn(async move {
                loop {
                    match events.recv().await {
                        Ok(event) if event.is_snapshot_relevant() => shared.schedule_snapshot(),
                        Ok(_) => {}
                        Err(RecvError::Lagged(missed)) => {
                            debug!(missed, "Tab event receiver lagged");
                            shared.schedule_snapshot();
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }));
            info!("Sync engine started");
        }
        self.set_identity(identity).await;
    }

    /// Switches the device identity. The old command subscription is torn
    /// down before anything is written or subscribed for the new one.
    pub async fn set_identity(&self, identity: Option<DeviceIdentity>) {
        {
            let _subscribing = self.shared.subscribing.lock().await;
            self.shared.stop_listener();
            self.shared.writer.set_identity(identity.clone());
        }
        if identity.is_some() {
            self.shared.flush().await;
            self.shared.ensure_listener().await;
        }
    }

    pub fn identity(&self) -> Option<DeviceIdentity> {
        self.shared.writer.identity()
    }

    /// Schedules a debounced snapshot write.
    pub fn request_snapshot(&self) {
        self.shared.schedule_snapshot();
    }

    /// Writes a snapshot immediately, bypassing the debounce window.
    pub async fn sync_now(&self) -> SnapshotOutcome {
        self.shared.debouncer().cancel();
        self.shared.flush().await
    }

    /// Updates the device name carried by subsequent snapshot writes.
    pub fn set_device_name(&self, device_name: &str) {
        self.shared.writer.set_device_name(device_name);
    }

    pub fn is_running(&self) -> bool {
        self.events_task.is_some()
    }

    pub async fn is_listening(&self) -> bool {
        self.shared.listener().as_ref().is_some_and(|l| !l.is_stopped())
    }

    pub fn has_pending_snapshot(&self) -> bool {
        self.shared.debouncer().is_pending()
    }

    /// Cancels the pending snapshot timer, the tab-event loop and the command
    /// subscription.
    pub fn stop(&mut self) {
        self.halt();
        info!("Sync engine stopped");
    }

    fn halt(&mut self) {
        self.shared.stopped.store(true, Ordering::SeqCst);
        self.shared.debouncer().cancel();
        if let Some(task) = self.events_task.take() {
            task.abort();
        }
        self.shared.stop_listener();
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.halt();
    }
}
