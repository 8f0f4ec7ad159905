use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::errors::SettingsError;

/// Fastest poll rate the REST driver accepts.
pub const MIN_POLL_INTERVAL_MS: u64 = 250;

/// Top-level engine settings container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EngineSettings {
    #[serde(default)]
    pub sync: SyncSettings,
}

impl EngineSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.sync.validate()
    }
}

/// Timing and labelling knobs for the sync engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncSettings {
    /// Quiescence window for the trailing snapshot debounce.
    pub debounce_ms: u64,
    /// How often the REST driver polls a subscribed collection.
    pub poll_interval_ms: u64,
    /// Browser label used in default device names.
    pub browser_name: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 2000,
            poll_interval_ms: 2000,
            browser_name: "Chrome".to_string(),
        }
    }
}

impl SyncSettings {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// A zero window would write on every event; polls faster than
    /// [`MIN_POLL_INTERVAL_MS`] are refused.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.debounce_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "sync.debounce_ms must be greater than 0".to_string(),
            ));
        }
        if self.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(SettingsError::InvalidValue(format!(
                "sync.poll_interval_ms must be at least {}",
                MIN_POLL_INTERVAL_MS
            )));
        }
        if self.browser_name.trim().is_empty() {
            return Err(SettingsError::InvalidValue(
                "sync.browser_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
