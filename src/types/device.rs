use serde::{Deserialize, Serialize};

use super::tab::TabSnapshot;

/// The document stored at `devices/{deviceId}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(default)]
    pub device_name: String,
    /// Server-assigned epoch milliseconds of the last snapshot write.
    #[serde(default)]
    pub last_updated: Option<i64>,
    #[serde(default)]
    pub tabs: Vec<TabSnapshot>,
    #[serde(default)]
    pub tab_count: usize,
}

/// A device document together with the id it is stored under.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredDevice {
    pub device_id: String,
    #[serde(flatten)]
    pub device: Device,
}

/// The identity this installation syncs as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub device_id: String,
    pub device_name: Option<String>,
}

impl DeviceIdentity {
    pub fn new(device_id: impl Into<String>, device_name: Option<String>) -> Self {
        Self {
            device_id: device_id.into(),
            device_name,
        }
    }
}

/// Where this installation is in its setup lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleState {
    /// No store credentials yet.
    Uninitialized,
    /// Store credentials known, no device identity.
    Configured,
    /// A device id exists but the sync engine is not running.
    DeviceSelected,
    /// The sync engine is running for the selected device.
    Active,
}

/// Default label for a freshly registered device, e.g. `"Chrome 2026-10-18"`.
pub fn default_device_name(browser_name: &str, date: chrono::NaiveDate) -> String {
    format!("{} {}", browser_name, date.format("%Y-%m-%d"))
}

/// First eight characters of a device id for display. Shorter ids are
/// returned whole.
pub fn short_device_id(device_id: &str) -> &str {
    device_id
        .char_indices()
        .nth(8)
        .map_or(device_id, |(end, _)| &device_id[..end])
}
