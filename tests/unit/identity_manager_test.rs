use std::sync::Arc;

use tabsync::database::Database;
use tabsync::managers::identity_manager::{IdentityManager, IdentityManagerTrait};
use tabsync::types::config::StoreConfig;
use tabsync::types::device::{DeviceIdentity, LifecycleState};

fn manager() -> IdentityManager {
    IdentityManager::new(Arc::new(Database::open_in_memory().unwrap()))
}

fn config() -> StoreConfig {
    StoreConfig::from_json(r#"{"apiKey":"k","projectId":"p","appId":"1:2:web:3"}"#).unwrap()
}

#[test]
fn test_fresh_install_is_uninitialized() {
    let mgr = manager();
    assert_eq!(mgr.lifecycle_state().unwrap(), LifecycleState::Uninitialized);
    assert!(mgr.store_config().unwrap().is_none());
    assert!(mgr.identity().unwrap().is_none());
}

#[test]
fn test_lifecycle_progression() {
    let mgr = manager();
    mgr.save_store_config(&config()).unwrap();
    assert_eq!(mgr.lifecycle_state().unwrap(), LifecycleState::Configured);

    mgr.set_identity(&DeviceIdentity::new("dev-1", Some("Laptop".into())))
        .unwrap();
    assert_eq!(mgr.lifecycle_state().unwrap(), LifecycleState::DeviceSelected);

    mgr.reset_identity().unwrap();
    assert_eq!(mgr.lifecycle_state().unwrap(), LifecycleState::Configured);

    mgr.clear_store_config().unwrap();
    assert_eq!(mgr.lifecycle_state().unwrap(), LifecycleState::Uninitialized);
}

#[test]
fn test_store_config_round_trips() {
    let mgr = manager();
    mgr.save_store_config(&config()).unwrap();
    let loaded = mgr.store_config().unwrap().unwrap();
    assert_eq!(loaded, config());
    assert_eq!(loaded.app_id.as_deref(), Some("1:2:web:3"));
}

#[test]
fn test_set_identity_overwrites_previous() {
    let mgr = manager();
    mgr.set_identity(&DeviceIdentity::new("dev-1", Some("Laptop".into())))
        .unwrap();
    mgr.set_identity(&DeviceIdentity::new("dev-2", None)).unwrap();
    assert_eq!(
        mgr.identity().unwrap(),
        Some(DeviceIdentity::new("dev-2", None))
    );
}

#[test]
fn test_set_device_name_keeps_id() {
    let mgr = manager();
    mgr.set_identity(&DeviceIdentity::new("dev-1", None)).unwrap();
    mgr.set_device_name("Work").unwrap();
    let identity = mgr.identity().unwrap().unwrap();
    assert_eq!(identity.device_id, "dev-1");
    assert_eq!(identity.device_name.as_deref(), Some("Work"));
}

#[test]
fn test_generated_device_ids_are_unique() {
    let a = IdentityManager::generate_device_id();
    let b = IdentityManager::generate_device_id();
    assert_ne!(a, b);
    assert!(!a.contains('/'));
}

#[test]
fn test_config_debug_redacts_api_key() {
    let printed = format!("{:?}", config());
    assert!(!printed.contains("\"k\""));
    assert!(printed.contains("<redacted>"));
}

#[test]
fn test_config_requires_api_key_and_project() {
    assert!(StoreConfig::from_json(r#"{"apiKey":"","projectId":"p"}"#).is_err());
    assert!(StoreConfig::from_json(r#"{"apiKey":"k"}"#).is_err());
    assert!(StoreConfig::from_json("not json").is_err());
}
