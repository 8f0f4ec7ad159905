//! Device registry: the `devices` collection.

use serde_json::{json, Value};
use tracing::info;

use crate::store::{paths, Document, DocumentStore, DocumentWrite};
use crate::types::device::{Device, RegisteredDevice};
use crate::types::errors::StoreError;

fn decode_device(data: Document) -> Result<Device, StoreError> {
    Ok(serde_json::from_value(Value::Object(data))?)
}

/// Creates a device document with an empty tab list under `device_id`.
pub async fn register_device(
    store: &dyn DocumentStore,
    device_id: &str,
    device_name: &str,
) -> Result<(), StoreError> {
    let path = paths::device(device_id)?;
    let write = DocumentWrite::default()
        .with_field("deviceName", Value::from(device_name))
        .with_field("tabs", json!([]))
        .with_field("tabCount", Value::from(0))
        .with_server_timestamp("lastUpdated");
    store.set(&path, write).await?;
    info!(device_id, device_name, "Device registered");
    Ok(())
}

pub async fn get_device(
    store: &dyn DocumentStore,
    device_id: &str,
) -> Result<Option<Device>, StoreError> {
    let path = paths::device(device_id)?;
    store.get(&path).await?.map(decode_device).transpose()
}

/// All devices, most recently active first. Devices that never wrote a
/// snapshot sort last.
pub async fn list_devices(store: &dyn DocumentStore) -> Result<Vec<RegisteredDevice>, StoreError> {
    let mut devices = store
        .list(&paths::devices())
        .await?
        .into_iter()
        .map(|(path, data)| {
            Ok(RegisteredDevice {
                device_id: path.id().to_string(),
                device: decode_device(data)?,
            })
        })
        .collect::<Result<Vec<_>, StoreError>>()?;
    devices.sort_by(|a, b| b.device.last_updated.cmp(&a.device.last_updated));
    Ok(devices)
}

/// Updates only the `deviceName` field of a device document.
pub async fn rename_device(
    store: &dyn DocumentStore,
    device_id: &str,
    device_name: &str,
) -> Result<(), StoreError> {
    let path = paths::device(device_id)?;
    let write = DocumentWrite::default()
        .with_field("deviceName", Value::from(device_name))
        .merged();
    store.set(&path, write).await
}
