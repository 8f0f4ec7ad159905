//! Snapshot writer: mirrors this device's open tabs into its device document.

use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::{debug, warn};

use crate::browser::BrowserHost;
use crate::store::{paths, DocumentStore, DocumentWrite};
use crate::types::device::DeviceIdentity;
use crate::types::errors::StoreError;
use crate::types::tab::TabSnapshot;

/// What a single snapshot attempt did.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotOutcome {
    /// Tabs were written; carries the tab count.
    Written(usize),
    /// No device identity yet, nothing to write to.
    NoIdentity,
    /// Reading tabs or writing the document failed; the next trigger retries.
    Failed(String),
    /// The owning engine has been stopped.
    Stopped,
}

/// Reads the full tab set and replaces the device document's tab list.
///
/// The identity slot is shared with the engine so that a write scheduled
/// before an identity change lands on whatever identity is current when it
/// fires.
pub struct SnapshotWriter {
    store: Arc<dyn DocumentStore>,
    browser: Arc<dyn BrowserHost>,
    identity: RwLock<Option<DeviceIdentity>>,
}

impl SnapshotWriter {
    pub fn new(store: Arc<dyn DocumentStore>, browser: Arc<dyn BrowserHost>) -> Self {
        Self {
            store,
            browser,
            identity: RwLock::new(None),
        }
    }

    pub fn identity(&self) -> Option<DeviceIdentity> {
        self.identity
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set_identity(&self, identity: Option<DeviceIdentity>) {
        *self.identity.write().unwrap_or_else(|e| e.into_inner()) = identity;
    }

    pub fn set_device_name(&self, name: &str) {
        if let Some(identity) = self
            .identity
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .as_mut()
        {
            identity.device_name = Some(name.to_string());
        }
    }

    /// Writes the current tab state. Never returns an error: failures are
    /// logged and left for the next trigger.
    pub async fn write(&self) -> SnapshotOutcome {
        let Some(identity) = self.identity() else {
            debug!("No device identity yet, skipping snapshot write");
            return SnapshotOutcome::NoIdentity;
        };

        let tabs = match self.browser.list_tabs().await {
            Ok(tabs) => tabs,
            Err(e) => {
                warn!(device_id = %identity.device_id, error = %e, "Failed to read local tabs");
                return SnapshotOutcome::Failed(e.to_string());
            }
        };
        let snapshots: Vec<TabSnapshot> = tabs.iter().map(TabSnapshot::from).collect();
        let count = snapshots.len();

        match self.put(&identity, snapshots).await {
            Ok(()) => {
                debug!(device_id = %identity.device_id, tab_count = count, "Snapshot written");
                SnapshotOutcome::Written(count)
            }
            Err(e) => {
                warn!(device_id = %identity.device_id, error = %e, "Snapshot write failed");
                SnapshotOutcome::Failed(e.to_string())
            }
        }
    }

    async fn put(&self, identity: &DeviceIdentity, tabs: Vec<TabSnapshot>) -> Result<(), StoreError> {
        let path = paths::device(&identity.device_id)?;
        let count = tabs.len();
        let mut write = DocumentWrite::default()
            .with_field("tabs", serde_json::to_value(&tabs)?)
            .with_field("tabCount", Value::from(count))
            .with_server_timestamp("lastUpdated")
            .merged();
        if let Some(name) = &identity.device_name {
            write = write.with_field("deviceName", Value::from(name.as_str()));
        }
        self.store.set(&path, write).await
    }
}
