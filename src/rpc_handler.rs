//! RPC method handler for the TabSync JSON-RPC protocol.
//!
//! Extracted from `rpc_server.rs` so it can be unit-tested independently.
//! The `handle_method` function dispatches presentation-layer intents to the
//! `App` and feeds tab reports from the extension into the `TabManager` mirror.

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokio::sync::Mutex as AsyncMutex;

use crate::app::App;
use crate::managers::tab_manager::TabManager;
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::types::tab::{BrowserTab, TabId};

/// Everything an RPC call can reach.
pub struct RpcState {
    pub app: AsyncMutex<App>,
    pub tabs: Arc<TabManager>,
    pub settings: Mutex<SettingsEngine>,
}

fn str_param<'a>(params: &'a Value, name: &str) -> Result<&'a str, String> {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("missing {}", name))
}

fn tab_id_param(params: &Value) -> Result<TabId, String> {
    params
        .get("tabId")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| "missing tabId".to_string())
}

fn tab_param(params: &Value) -> Result<BrowserTab, String> {
    let tab = params.get("tab").cloned().ok_or("missing tab")?;
    serde_json::from_value(tab).map_err(|e| format!("invalid tab: {}", e))
}

/// Dispatch a JSON-RPC method call to the appropriate handler.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub async fn handle_method(state: &RpcState, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        // ─── Lifecycle ───
        "status" => {
            let a = state.app.lock().await;
            let status = a.status().map_err(|e| e.to_string())?;
            let identity = a.identity_snapshot();
            Ok(json!({
                "state": status,
                "deviceId": identity.as_ref().map(|i| i.device_id.clone()),
                "deviceName": identity.and_then(|i| i.device_name),
            }))
        }
        "config.set" => {
            let blob = match params.get("config") {
                Some(Value::String(s)) => s.clone(),
                Some(obj @ Value::Object(_)) => obj.to_string(),
                _ => return Err("missing config".to_string()),
            };
            let mut a = state.app.lock().await;
            let status = a.configure(&blob).await.map_err(|e| e.to_string())?;
            Ok(json!({"state": status}))
        }
        "config.clear" => {
            let mut a = state.app.lock().await;
            a.reset_configuration().await.map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }

        // ─── Settings ───
        "settings.get" => {
            let engine = state.settings.lock().map_err(|e| e.to_string())?;
            serde_json::to_value(engine.get_settings()).map_err(|e| e.to_string())
        }
        "settings.set" => {
            let key = str_param(params, "key")?;
            let value = params.get("value").cloned().ok_or("missing value")?;
            let sync_settings = {
                let mut engine = state.settings.lock().map_err(|e| e.to_string())?;
                engine.set_value(key, value).map_err(|e| e.to_string())?;
                engine.get_settings().sync.clone()
            };
            state.app.lock().await.set_settings(sync_settings);
            Ok(json!({"ok": true}))
        }

        // ─── Devices ───
        "device.list" => {
            let a = state.app.lock().await;
            let devices = a.list_devices().await.map_err(|e| e.to_string())?;
            serde_json::to_value(devices).map_err(|e| e.to_string())
        }
        "device.register" => {
            let name = params.get("name").and_then(|v| v.as_str()).map(str::to_string);
            let mut a = state.app.lock().await;
            let device_id = a.register_device(name).await.map_err(|e| e.to_string())?;
            Ok(json!({"deviceId": device_id}))
        }
        "device.select" => {
            let device_id = str_param(params, "deviceId")?;
            let mut a = state.app.lock().await;
            a.select_device(device_id).await.map_err(|e| e.to_string())?;
            Ok(json!({"deviceId": device_id}))
        }
        "device.rename" => {
            let name = str_param(params, "name")?;
            if name.trim().is_empty() {
                return Err("device name cannot be empty".to_string());
            }
            let mut a = state.app.lock().await;
            a.rename_device(name).await.map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "device.reset" => {
            let mut a = state.app.lock().await;
            a.reset_identity().await.map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "sync.now" => {
            let a = state.app.lock().await;
            let outcome = a.sync_now().await.map_err(|e| e.to_string())?;
            Ok(json!({"outcome": format!("{:?}", outcome)}))
        }

        // ─── Commands ───
        "command.closeTab" => {
            let target = str_param(params, "deviceId")?;
            let tab_id = tab_id_param(params)?;
            let a = state.app.lock().await;
            let command_id = a
                .close_remote_tab(target, tab_id)
                .await
                .map_err(|e| e.to_string())?;
            Ok(json!({"commandId": command_id}))
        }
        "command.openTab" => {
            let target = str_param(params, "deviceId")?;
            let url = str_param(params, "url")?;
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("invalid url: must start with http:// or https://".to_string());
            }
            let title = params.get("title").and_then(|v| v.as_str()).map(str::to_string);
            let active = params.get("active").and_then(|v| v.as_bool()).unwrap_or(false);
            let a = state.app.lock().await;
            let command_id = a
                .send_tab(target, url, title, active)
                .await
                .map_err(|e| e.to_string())?;
            Ok(json!({"commandId": command_id}))
        }

        // ─── Tab mirror feed ───
        "tabs.replace" => {
            let tabs = params.get("tabs").cloned().ok_or("missing tabs")?;
            let tabs: Vec<BrowserTab> =
                serde_json::from_value(tabs).map_err(|e| format!("invalid tabs: {}", e))?;
            let count = tabs.len();
            state.tabs.replace_all(tabs);
            Ok(json!({"tabCount": count}))
        }
        "tabs.created" => {
            state.tabs.apply_created(tab_param(params)?);
            Ok(json!({"ok": true}))
        }
        "tabs.removed" => {
            state.tabs.apply_removed(tab_id_param(params)?);
            Ok(json!({"ok": true}))
        }
        "tabs.updated" => {
            let tab = tab_param(params)?;
            let change = params.get("changeInfo").cloned().unwrap_or(json!({}));
            let url_changed = change.get("url").is_some();
            let load_complete = change.get("status").and_then(|v| v.as_str()) == Some("complete");
            state.tabs.apply_updated(tab, url_changed, load_complete);
            Ok(json!({"ok": true}))
        }
        "tabs.moved" => {
            let tab_id = tab_id_param(params)?;
            let to_index = params
                .get("toIndex")
                .and_then(|v| v.as_u64())
                .ok_or("missing toIndex")? as usize;
            state.tabs.apply_moved(tab_id, to_index).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "tabs.activated" => {
            state
                .tabs
                .apply_activated(tab_id_param(params)?)
                .map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}
