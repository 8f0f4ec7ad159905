//! Identity Manager for TabSync.
//!
//! Persists the device-side state the sync core needs but the remote store
//! does not hold: the store-access config blob, this installation's device id
//! and its cached device name.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::database::connection::Database;
use crate::types::config::StoreConfig;
use crate::types::device::{DeviceIdentity, LifecycleState};
use crate::types::errors::LocalStateError;

const KEY_STORE_CONFIG: &str = "store_config";
const KEY_DEVICE_ID: &str = "device_id";
const KEY_DEVICE_NAME: &str = "device_name";

/// Trait defining local identity operations.
pub trait IdentityManagerTrait {
    fn store_config(&self) -> Result<Option<StoreConfig>, LocalStateError>;
    fn save_store_config(&self, config: &StoreConfig) -> Result<(), LocalStateError>;
    fn clear_store_config(&self) -> Result<(), LocalStateError>;
    fn identity(&self) -> Result<Option<DeviceIdentity>, LocalStateError>;
    fn set_identity(&self, identity: &DeviceIdentity) -> Result<(), LocalStateError>;
    fn set_device_name(&self, name: &str) -> Result<(), LocalStateError>;
    fn reset_identity(&self) -> Result<(), LocalStateError>;
    fn lifecycle_state(&self) -> Result<LifecycleState, LocalStateError>;
}

/// Identity manager backed by the local SQLite `local_state` table.
pub struct IdentityManager {
    db: Arc<Database>,
}

impl IdentityManager {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// A fresh, opaque device id.
    pub fn generate_device_id() -> String {
        Uuid::new_v4().to_string()
    }

    fn get(&self, key: &str) -> Result<Option<String>, LocalStateError> {
        let value = self
            .db
            .connection()
            .query_row(
                "SELECT value FROM local_state WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &str) -> Result<(), LocalStateError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;
        self.db.connection().execute(
            "INSERT INTO local_state (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }

    fn remove(&self, keys: &[&str]) -> Result<(), LocalStateError> {
        let conn = self.db.connection();
        for key in keys {
            conn.execute("DELETE FROM local_state WHERE key = ?1", params![key])?;
        }
        Ok(())
    }
}

impl IdentityManagerTrait for IdentityManager {
    fn store_config(&self) -> Result<Option<StoreConfig>, LocalStateError> {
        match self.get(KEY_STORE_CONFIG)? {
            Some(blob) => Ok(Some(serde_json::from_str(&blob)?)),
            None => Ok(None),
        }
    }

    fn save_store_config(&self, config: &StoreConfig) -> Result<(), LocalStateError> {
        let blob = serde_json::to_string(config)?;
        self.put(KEY_STORE_CONFIG, &blob)
    }

    fn clear_store_config(&self) -> Result<(), LocalStateError> {
        self.remove(&[KEY_STORE_CONFIG])
    }

    fn identity(&self) -> Result<Option<DeviceIdentity>, LocalStateError> {
        let Some(device_id) = self.get(KEY_DEVICE_ID)? else {
            return Ok(None);
        };
        let device_name = self.get(KEY_DEVICE_NAME)?;
        Ok(Some(DeviceIdentity {
            device_id,
            device_name,
        }))
    }

    fn set_identity(&self, identity: &DeviceIdentity) -> Result<(), LocalStateError> {
        self.put(KEY_DEVICE_ID, &identity.device_id)?;
        match &identity.device_name {
            Some(name) => self.put(KEY_DEVICE_NAME, name),
            None => self.remove(&[KEY_DEVICE_NAME]),
        }
    }

    fn set_device_name(&self, name: &str) -> Result<(), LocalStateError> {
        self.put(KEY_DEVICE_NAME, name)
    }

    /// Forgets the local identity marker only. The device document in the
    /// remote store is left as it is.
    fn reset_identity(&self) -> Result<(), LocalStateError> {
        self.remove(&[KEY_DEVICE_ID, KEY_DEVICE_NAME])
    }

    /// Persisted part of the lifecycle; never reports `Active`, which depends
    /// on whether a sync engine is running.
    fn lifecycle_state(&self) -> Result<LifecycleState, LocalStateError> {
        if self.get(KEY_STORE_CONFIG)?.is_none() {
            return Ok(LifecycleState::Uninitialized);
        }
        if self.get(KEY_DEVICE_ID)?.is_none() {
            return Ok(LifecycleState::Configured);
        }
        Ok(LifecycleState::DeviceSelected)
    }
}
