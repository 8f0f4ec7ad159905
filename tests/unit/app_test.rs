//! App lifecycle and presentation-layer intents against a shared in-memory store.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tabsync::app::App;
use tabsync::database::Database;
use tabsync::managers::identity_manager::IdentityManagerTrait;
use tabsync::managers::tab_manager::{TabManager, TabManagerTrait};
use tabsync::store::memory::MemoryStore;
use tabsync::store::{paths, DocumentStore, StoreFactory};
use tabsync::types::config::StoreConfig;
use tabsync::types::device::LifecycleState;
use tabsync::types::errors::{AppError, StoreError};
use tabsync::types::settings::SyncSettings;

const CONFIG: &str = r#"{"apiKey":"key","projectId":"proj"}"#;

fn factory(store: &Arc<MemoryStore>) -> Box<dyn StoreFactory> {
    let store = store.clone();
    Box::new(move |_: &StoreConfig| -> Result<Arc<dyn DocumentStore>, StoreError> {
        Ok(store.clone() as Arc<dyn DocumentStore>)
    })
}

fn app_on(store: &Arc<MemoryStore>, db: Arc<Database>) -> (App, Arc<TabManager>) {
    let tabs = Arc::new(TabManager::new());
    let app = App::new(db, tabs.clone(), factory(store), SyncSettings::default());
    (app, tabs)
}

fn fresh_app(store: &Arc<MemoryStore>) -> (App, Arc<TabManager>) {
    app_on(store, Arc::new(Database::open_in_memory().unwrap()))
}

async fn configured_app(store: &Arc<MemoryStore>) -> (App, Arc<TabManager>) {
    let (mut app, tabs) = fresh_app(store);
    app.configure(CONFIG).await.unwrap();
    (app, tabs)
}

#[tokio::test(start_paused = true)]
async fn test_fresh_app_is_uninitialized() {
    let store = Arc::new(MemoryStore::new());
    let (mut app, _tabs) = fresh_app(&store);

    assert_eq!(app.startup().await.unwrap(), LifecycleState::Uninitialized);
    assert!(matches!(
        app.register_device(None).await,
        Err(AppError::NotConfigured)
    ));
    assert!(matches!(app.sync_now().await, Err(AppError::NotConfigured)));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_config_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let (mut app, _tabs) = fresh_app(&store);

    assert!(matches!(
        app.configure(r#"{"apiKey":"key"}"#).await,
        Err(AppError::Config(_))
    ));
    assert_eq!(app.status().unwrap(), LifecycleState::Uninitialized);
}

#[tokio::test(start_paused = true)]
async fn test_register_device_activates_sync() {
    let store = Arc::new(MemoryStore::new());
    let (mut app, tabs) = configured_app(&store).await;
    assert_eq!(app.status().unwrap(), LifecycleState::Configured);
    tabs.open_tab("https://a.example", true);

    let device_id = app.register_device(None).await.unwrap();

    assert_eq!(app.status().unwrap(), LifecycleState::Active);
    let devices = app.list_devices().await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].device_id, device_id);
    assert!(devices[0].device.device_name.starts_with("Chrome "));
    assert_eq!(devices[0].device.tab_count, 1);
    assert_eq!(
        app.identity_snapshot().map(|i| i.device_id),
        Some(device_id)
    );
}

#[tokio::test(start_paused = true)]
async fn test_register_device_uses_given_name() {
    let store = Arc::new(MemoryStore::new());
    let (mut app, _tabs) = configured_app(&store).await;
    let id = app.register_device(Some("Work Laptop".into())).await.unwrap();
    let doc = store.peek(&paths::device(&id).unwrap()).unwrap();
    assert_eq!(doc["deviceName"], json!("Work Laptop"));
}

#[tokio::test(start_paused = true)]
async fn test_select_unknown_device_fails() {
    let store = Arc::new(MemoryStore::new());
    let (mut app, _tabs) = configured_app(&store).await;
    assert!(matches!(
        app.select_device("nope").await,
        Err(AppError::DeviceNotFound(id)) if id == "nope"
    ));
    assert_eq!(app.status().unwrap(), LifecycleState::Configured);
}

#[tokio::test(start_paused = true)]
async fn test_select_existing_device_takes_it_over() {
    let store = Arc::new(MemoryStore::new());
    let (mut old, old_tabs) = configured_app(&store).await;
    old_tabs.open_tab("https://old.example", true);
    let device_id = old.register_device(Some("Laptop".into())).await.unwrap();
    old.shutdown();

    let (mut reinstalled, tabs) = configured_app(&store).await;
    tabs.open_tab("https://fresh-1.example", true);
    tabs.open_tab("https://fresh-2.example", false);
    reinstalled.select_device(&device_id).await.unwrap();

    assert_eq!(reinstalled.status().unwrap(), LifecycleState::Active);
    let devices = reinstalled.list_devices().await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].device.device_name, "Laptop");
    let urls: Vec<&str> = devices[0].device.tabs.iter().map(|t| t.url.as_str()).collect();
    assert_eq!(urls, vec!["https://fresh-1.example", "https://fresh-2.example"]);
}

#[tokio::test(start_paused = true)]
async fn test_reset_identity_leaves_device_document() {
    let store = Arc::new(MemoryStore::new());
    let (mut app, _tabs) = configured_app(&store).await;
    let device_id = app.register_device(None).await.unwrap();

    app.reset_identity().await.unwrap();

    assert_eq!(app.status().unwrap(), LifecycleState::Configured);
    assert!(store.peek(&paths::device(&device_id).unwrap()).is_some());
    assert_eq!(store.subscriber_count(), 0);

    // A new device can be registered afterwards.
    app.register_device(None).await.unwrap();
    assert_eq!(app.status().unwrap(), LifecycleState::Active);
    assert_eq!(app.list_devices().await.unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_reset_configuration_forgets_everything_local() {
    let store = Arc::new(MemoryStore::new());
    let (mut app, _tabs) = configured_app(&store).await;
    app.register_device(None).await.unwrap();

    app.reset_configuration().await.unwrap();

    assert_eq!(app.status().unwrap(), LifecycleState::Uninitialized);
    assert!(app.identity.identity().unwrap().is_none());
    assert!(app.store().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_restart_resumes_saved_identity() {
    let store = Arc::new(MemoryStore::new());
    let db = Arc::new(Database::open_in_memory().unwrap());
    let device_id = {
        let (mut app, _tabs) = app_on(&store, db.clone());
        app.configure(CONFIG).await.unwrap();
        let id = app.register_device(None).await.unwrap();
        app.shutdown();
        id
    };
    let path = paths::device(&device_id).unwrap();
    let writes_before = store.write_count(&path);

    let (mut app, _tabs) = app_on(&store, db);
    assert_eq!(app.startup().await.unwrap(), LifecycleState::Active);
    assert_eq!(store.write_count(&path), writes_before + 1);
}

#[tokio::test(start_paused = true)]
async fn test_rename_requires_device_and_updates_store() {
    let store = Arc::new(MemoryStore::new());
    let (mut app, _tabs) = configured_app(&store).await;
    assert!(matches!(app.rename_device("X").await, Err(AppError::NoDevice)));

    let id = app.register_device(Some("Before".into())).await.unwrap();
    app.rename_device("  After  ").await.unwrap();

    let doc = store.peek(&paths::device(&id).unwrap()).unwrap();
    assert_eq!(doc["deviceName"], json!("After"));
    assert_eq!(
        app.identity_snapshot().and_then(|i| i.device_name),
        Some("After".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn test_rename_writes_snapshot_with_pending_tabs() {
    let store = Arc::new(MemoryStore::new());
    let (mut app, tabs) = configured_app(&store).await;
    let id = app.register_device(Some("Before".into())).await.unwrap();
    let path = paths::device(&id).unwrap();
    let before = store.peek(&path).unwrap();
    let writes = store.write_count(&path);

    tabs.open_tab("https://pending.example", true);
    tokio::time::sleep(Duration::from_millis(10)).await;
    app.rename_device("After").await.unwrap();

    let doc = store.peek(&path).unwrap();
    assert_eq!(doc["deviceName"], json!("After"));
    assert_eq!(doc["tabCount"], json!(1));
    assert_eq!(doc["tabs"][0]["url"], json!("https://pending.example"));
    assert_ne!(doc["lastUpdated"], before["lastUpdated"]);
    assert_eq!(store.write_count(&path), writes + 1);
    assert!(!app.engine().unwrap().has_pending_snapshot());
}

#[tokio::test(start_paused = true)]
async fn test_rename_while_offline_reaches_store_on_next_write() {
    let store = Arc::new(MemoryStore::new());
    let (mut app, _tabs) = configured_app(&store).await;
    let id = app.register_device(Some("Before".into())).await.unwrap();
    let path = paths::device(&id).unwrap();

    store.set_offline(true);
    assert!(app.rename_device("After").await.is_err());
    assert_eq!(store.peek(&path).unwrap()["deviceName"], json!("Before"));

    store.set_offline(false);
    app.sync_now().await.unwrap();
    assert_eq!(store.peek(&path).unwrap()["deviceName"], json!("After"));
    assert_eq!(
        app.identity_snapshot().and_then(|i| i.device_name),
        Some("After".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn test_commands_carry_sender_id() {
    let store = Arc::new(MemoryStore::new());
    let (mut sender, _tabs) = configured_app(&store).await;

    let anonymous = sender.close_remote_tab("target", 4).await.unwrap();
    let doc = store.peek(&paths::command("target", &anonymous).unwrap()).unwrap();
    assert_eq!(doc["fromDevice"], json!("unknown"));
    assert_eq!(doc["tabId"], json!(4));

    let me = sender.register_device(None).await.unwrap();
    let sent = sender
        .send_tab("target", "https://x.example", Some("X".into()), true)
        .await
        .unwrap();
    let doc = store.peek(&paths::command("target", &sent).unwrap()).unwrap();
    assert_eq!(doc["fromDevice"], json!(me));
    assert_eq!(doc["action"], json!("openTab"));
    assert_eq!(doc["active"], json!(true));
}

#[tokio::test(start_paused = true)]
async fn test_send_tab_reaches_other_device() {
    let store = Arc::new(MemoryStore::new());
    let (mut laptop, _laptop_tabs) = configured_app(&store).await;
    let (mut desktop, desktop_tabs) = configured_app(&store).await;
    laptop.register_device(Some("Laptop".into())).await.unwrap();
    let desktop_id = desktop.register_device(Some("Desktop".into())).await.unwrap();

    laptop
        .send_tab(&desktop_id, "https://shared.example", None, false)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let tabs = desktop_tabs.get_all_tabs();
    assert_eq!(tabs.len(), 1);
    assert_eq!(tabs[0].url, "https://shared.example");
    assert!(store
        .list(&paths::commands(&desktop_id).unwrap())
        .await
        .unwrap()
        .is_empty());

    // The new tab shows up in the desktop's snapshot after the debounce window.
    tokio::time::sleep(Duration::from_millis(2500)).await;
    let devices = laptop.list_devices().await.unwrap();
    let desktop_doc = devices.iter().find(|d| d.device_id == desktop_id).unwrap();
    assert_eq!(desktop_doc.device.tab_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_list_devices_most_recent_first() {
    let store = Arc::new(MemoryStore::new());
    let (mut a, _a_tabs) = configured_app(&store).await;
    let (mut b, _b_tabs) = configured_app(&store).await;
    let a_id = a.register_device(Some("A".into())).await.unwrap();
    let b_id = b.register_device(Some("B".into())).await.unwrap();

    let order: Vec<String> = a.list_devices().await.unwrap().into_iter().map(|d| d.device_id).collect();
    assert_eq!(order, vec![b_id.clone(), a_id.clone()]);

    a.sync_now().await.unwrap();
    let order: Vec<String> = b.list_devices().await.unwrap().into_iter().map(|d| d.device_id).collect();
    assert_eq!(order, vec![a_id, b_id]);
}
