//! Integration-level unit tests for the SettingsEngine public API.
//!
//! These tests exercise the SettingsEngine through its public trait interface,
//! validating default loading, value persistence, and reset behavior.

use tabsync::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use tabsync::types::errors::SettingsError;
use tabsync::types::settings::EngineSettings;
use tempfile::TempDir;

/// Helper: create a SettingsEngine backed by a temp directory that lives for the
/// duration of the test (the caller holds the `TempDir` handle).
fn engine_in_temp(dir: &TempDir) -> SettingsEngine {
    SettingsEngine::new(Some(dir.path().join("settings.json")))
}

#[test]
fn test_load_defaults_when_no_config_file_exists() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);

    let settings = engine.load().unwrap();

    assert_eq!(settings, EngineSettings::default());
    assert_eq!(settings.sync.debounce_ms, 2000);
    assert_eq!(settings.sync.browser_name, "Chrome");
}

/// After `set_value`, a fresh engine reading the same file sees the update.
#[test]
fn test_set_value_persists_changes() {
    let dir = TempDir::new().unwrap();
    {
        let mut engine = engine_in_temp(&dir);
        engine.load().unwrap();
        engine
            .set_value("sync.debounce_ms", serde_json::json!(500))
            .unwrap();
    }

    let mut engine = engine_in_temp(&dir);
    let settings = engine.load().unwrap();
    assert_eq!(settings.sync.debounce_ms, 500);
    assert_eq!(settings.sync.debounce_window(), std::time::Duration::from_millis(500));
}

#[test]
fn test_set_value_rejects_unknown_key() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();

    assert!(engine.set_value("sync.no_such_key", serde_json::json!(1)).is_err());
    assert!(engine.set_value("", serde_json::json!(1)).is_err());
}

#[test]
fn test_reset_restores_defaults() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();
    engine
        .set_value("sync.browser_name", serde_json::json!("Firefox"))
        .unwrap();

    engine.reset().unwrap();

    let mut reloaded = engine_in_temp(&dir);
    assert_eq!(reloaded.load().unwrap(), EngineSettings::default());
}

#[test]
fn test_set_value_rejects_out_of_range_timings() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();

    assert!(matches!(
        engine.set_value("sync.debounce_ms", serde_json::json!(0)),
        Err(SettingsError::InvalidValue(_))
    ));
    assert!(matches!(
        engine.set_value("sync.poll_interval_ms", serde_json::json!(100)),
        Err(SettingsError::InvalidValue(_))
    ));
    assert!(matches!(
        engine.set_value("sync.browser_name", serde_json::json!("  ")),
        Err(SettingsError::InvalidValue(_))
    ));
    assert_eq!(engine.get_settings(), &EngineSettings::default());
    assert!(!dir.path().join("settings.json").exists());

    engine
        .set_value("sync.poll_interval_ms", serde_json::json!(250))
        .unwrap();
    assert_eq!(engine.get_settings().sync.poll_interval_ms, 250);
}
