//! App Core for TabSync.
//!
//! Central struct holding the local state, the tab model, the current store
//! client and the sync engine, and driving the device identity lifecycle:
//! `uninitialized → configured → device-selected → active`.

use std::sync::Arc;

use tracing::{info, warn};

use crate::browser::BrowserHost;
use crate::database::connection::Database;
use crate::managers::identity_manager::{IdentityManager, IdentityManagerTrait};
use crate::store::{DocumentStore, StoreFactory};
use crate::sync::{enqueue_command, registry, SnapshotOutcome, SyncEngine};
use crate::types::command::CommandAction;
use crate::types::config::StoreConfig;
use crate::types::device::{default_device_name, DeviceIdentity, LifecycleState, RegisteredDevice};
use crate::types::errors::AppError;
use crate::types::settings::SyncSettings;
use crate::types::tab::TabId;

/// `fromDevice` recorded on commands sent before a device is selected.
const UNKNOWN_SENDER: &str = "unknown";

/// Central application struct.
pub struct App {
    pub db: Arc<Database>,
    pub identity: IdentityManager,
    browser: Arc<dyn BrowserHost>,
    factory: Box<dyn StoreFactory>,
    settings: SyncSettings,
    store: Option<Arc<dyn DocumentStore>>,
    engine: Option<SyncEngine>,
}

impl App {
    /// Creates a new App on top of an opened local database.
    pub fn new(
        db: Arc<Database>,
        browser: Arc<dyn BrowserHost>,
        factory: Box<dyn StoreFactory>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            identity: IdentityManager::new(Arc::clone(&db)),
            db,
            browser,
            factory,
            settings,
            store: None,
            engine: None,
        }
    }

    /// Startup sequence: connect to the saved store (if any) and start syncing
    /// as the saved device (if any).
    pub async fn startup(&mut self) -> Result<LifecycleState, AppError> {
        if let Some(config) = self.identity.store_config()? {
            self.connect(&config).await?;
        }
        self.status()
    }

    /// Shutdown sequence: stop the engine and drop the store client.
    pub fn shutdown(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.stop();
        }
        self.store = None;
    }

    pub fn status(&self) -> Result<LifecycleState, AppError> {
        if self.engine.as_ref().is_some_and(|e| e.is_running()) {
            return Ok(LifecycleState::Active);
        }
        Ok(self.identity.lifecycle_state()?)
    }

    /// The saved identity, or `None` if none is saved or it cannot be read.
    pub fn identity_snapshot(&self) -> Option<DeviceIdentity> {
        self.identity.identity().ok().flatten()
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Applies new engine settings. Takes effect on the next engine start.
    pub fn set_settings(&mut self, settings: SyncSettings) {
        self.settings = settings;
    }

    pub fn store(&self) -> Option<Arc<dyn DocumentStore>> {
        self.store.clone()
    }

    pub fn engine(&self) -> Option<&SyncEngine> {
        self.engine.as_ref()
    }

    fn require_store(&self) -> Result<Arc<dyn DocumentStore>, AppError> {
        self.store.clone().ok_or(AppError::NotConfigured)
    }

    fn require_engine(&self) -> Result<&SyncEngine, AppError> {
        self.engine.as_ref().ok_or(AppError::NotConfigured)
    }

    /// Discards the current store client and engine, then builds new ones
    /// from `config`.
    async fn connect(&mut self, config: &StoreConfig) -> Result<(), AppError> {
        self.shutdown();
        let store = self.factory.connect(config)?;
        let mut engine = SyncEngine::new(Arc::clone(&store), Arc::clone(&self.browser), &self.settings);
        let identity = self.identity.identity()?;
        if identity.is_some() {
            engine.start(identity).await;
        }
        info!(project_id = %config.project_id, "Connected to store");
        self.store = Some(store);
        self.engine = Some(engine);
        Ok(())
    }

    /// Parses, validates and saves a store config blob, then reconnects.
    pub async fn configure(&mut self, blob: &str) -> Result<LifecycleState, AppError> {
        let config = StoreConfig::from_json(blob)?;
        self.identity.save_store_config(&config)?;
        self.connect(&config).await?;
        self.status()
    }

    /// Forgets the store config and the local identity.
    pub async fn reset_configuration(&mut self) -> Result<(), AppError> {
        self.shutdown();
        self.identity.clear_store_config()?;
        self.identity.reset_identity()?;
        info!("Configuration reset");
        Ok(())
    }

    /// Makes `identity` the current one and (re)starts the engine for it.
    async fn activate(&mut self, identity: DeviceIdentity) -> Result<(), AppError> {
        self.identity.set_identity(&identity)?;
        let engine = self.engine.as_mut().ok_or(AppError::NotConfigured)?;
        if engine.is_running() {
            engine.set_identity(Some(identity)).await;
        } else {
            engine.start(Some(identity)).await;
        }
        Ok(())
    }

    /// Registers this browser as a brand-new device and starts syncing as it.
    pub async fn register_device(&mut self, device_name: Option<String>) -> Result<String, AppError> {
        let store = self.require_store()?;
        let device_name = device_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| {
                default_device_name(&self.settings.browser_name, chrono::Local::now().date_naive())
            });
        let device_id = IdentityManager::generate_device_id();
        registry::register_device(store.as_ref(), &device_id, &device_name).await?;
        self.activate(DeviceIdentity::new(device_id.clone(), Some(device_name)))
            .await?;
        Ok(device_id)
    }

    /// Adopts an existing device id. The immediate snapshot write that follows
    /// replaces that device's tabs with this browser's own.
    pub async fn select_device(&mut self, device_id: &str) -> Result<(), AppError> {
        let store = self.require_store()?;
        let device = registry::get_device(store.as_ref(), device_id)
            .await?
            .ok_or_else(|| AppError::DeviceNotFound(device_id.to_string()))?;
        let name = Some(device.device_name).filter(|n| !n.is_empty());
        info!(device_id, "Taking over existing device");
        self.activate(DeviceIdentity::new(device_id, name)).await
    }

    /// Clears the local identity marker. The device document stays in the
    /// store, orphaned until reused or cleaned up by hand.
    pub async fn reset_identity(&mut self) -> Result<(), AppError> {
        if let Some(engine) = self.engine.as_mut() {
            engine.set_identity(None).await;
            engine.stop();
        }
        self.identity.reset_identity()?;
        info!("Device identity reset");
        Ok(())
    }

    /// Renames this device locally, then writes an immediate snapshot carrying
    /// the new name. Without a running engine only `deviceName` is merged.
    pub async fn rename_device(&mut self, device_name: &str) -> Result<(), AppError> {
        let device_name = device_name.trim();
        let identity = self.identity.identity()?.ok_or(AppError::NoDevice)?;
        let store = self.require_store()?;
        self.identity.set_device_name(device_name)?;

        if let Some(engine) = self.engine.as_ref().filter(|e| e.is_running()) {
            engine.set_device_name(device_name);
            match engine.sync_now().await {
                SnapshotOutcome::Written(_) => return Ok(()),
                outcome => {
                    warn!(?outcome, "Snapshot after rename was not written, merging name only")
                }
            }
        }
        registry::rename_device(store.as_ref(), &identity.device_id, device_name).await?;
        Ok(())
    }

    pub async fn list_devices(&self) -> Result<Vec<RegisteredDevice>, AppError> {
        let store = self.require_store()?;
        Ok(registry::list_devices(store.as_ref()).await?)
    }

    /// Immediate snapshot write.
    pub async fn sync_now(&self) -> Result<SnapshotOutcome, AppError> {
        Ok(self.require_engine()?.sync_now().await)
    }

    fn sender_id(&self) -> String {
        match self.identity.identity() {
            Ok(Some(identity)) => identity.device_id,
            Ok(None) => UNKNOWN_SENDER.to_string(),
            Err(e) => {
                warn!(error = %e, "Could not read local identity for command sender");
                UNKNOWN_SENDER.to_string()
            }
        }
    }

    /// Asks `target_device_id` to close one of its tabs. Returns the command id.
    pub async fn close_remote_tab(&self, target_device_id: &str, tab_id: TabId) -> Result<String, AppError> {
        let store = self.require_store()?;
        let from = self.sender_id();
        Ok(enqueue_command(store.as_ref(), target_device_id, CommandAction::CloseTab { tab_id }, &from).await?)
    }

    /// Asks `target_device_id` to open `url`. Returns the command id.
    pub async fn send_tab(
        &self,
        target_device_id: &str,
        url: &str,
        title: Option<String>,
        active: bool,
    ) -> Result<String, AppError> {
        let store = self.require_store()?;
        let from = self.sender_id();
        let action = CommandAction::OpenTab {
            url: url.to_string(),
            title,
            active: Some(active),
        };
        Ok(enqueue_command(store.as_ref(), target_device_id, action, &from).await?)
    }
}
