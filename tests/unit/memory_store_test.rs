use futures::StreamExt;
use serde_json::json;
use tabsync::store::memory::MemoryStore;
use tabsync::store::{paths, ChangeKind, DocumentStore, DocumentWrite};
use tabsync::types::errors::StoreError;

fn write(fields: serde_json::Value) -> DocumentWrite {
    match fields {
        serde_json::Value::Object(map) => DocumentWrite::new(map),
        _ => panic!("object expected"),
    }
}

#[tokio::test]
async fn test_set_then_get() {
    let store = MemoryStore::new();
    let path = paths::device("dev-1").unwrap();
    store.set(&path, write(json!({"deviceName": "Laptop"}))).await.unwrap();
    let doc = store.get(&path).await.unwrap().unwrap();
    assert_eq!(doc["deviceName"], json!("Laptop"));
}

#[tokio::test]
async fn test_get_missing_is_none() {
    let store = MemoryStore::new();
    let path = paths::device("nobody").unwrap();
    assert!(store.get(&path).await.unwrap().is_none());
}

#[tokio::test]
async fn test_merge_keeps_untouched_fields() {
    let store = MemoryStore::new();
    let path = paths::device("dev-1").unwrap();
    store
        .set(&path, write(json!({"deviceName": "Laptop", "tabCount": 3})))
        .await
        .unwrap();
    store
        .set(&path, write(json!({"tabCount": 1})).merged())
        .await
        .unwrap();
    let doc = store.peek(&path).unwrap();
    assert_eq!(doc["deviceName"], json!("Laptop"));
    assert_eq!(doc["tabCount"], json!(1));
}

#[tokio::test]
async fn test_overwrite_drops_untouched_fields() {
    let store = MemoryStore::new();
    let path = paths::device("dev-1").unwrap();
    store
        .set(&path, write(json!({"deviceName": "Laptop", "tabCount": 3})))
        .await
        .unwrap();
    store.set(&path, write(json!({"tabCount": 1}))).await.unwrap();
    assert!(store.peek(&path).unwrap().get("deviceName").is_none());
}

#[tokio::test]
async fn test_server_timestamps_are_monotonic() {
    let store = MemoryStore::new();
    let path = paths::device("dev-1").unwrap();
    let stamped = || DocumentWrite::default().with_server_timestamp("lastUpdated");
    store.set(&path, stamped()).await.unwrap();
    let first = store.peek(&path).unwrap()["lastUpdated"].as_i64().unwrap();
    store.set(&path, stamped()).await.unwrap();
    let second = store.peek(&path).unwrap()["lastUpdated"].as_i64().unwrap();
    assert!(second > first);
    assert_eq!(store.write_count(&path), 2);
}

#[tokio::test]
async fn test_list_only_returns_collection_members() {
    let store = MemoryStore::new();
    store
        .set(&paths::device("a").unwrap(), write(json!({})))
        .await
        .unwrap();
    store
        .set(&paths::device("b").unwrap(), write(json!({})))
        .await
        .unwrap();
    store
        .set(&paths::command("a", "c1").unwrap(), write(json!({"action": "closeTab"})))
        .await
        .unwrap();

    let devices = store.list(&paths::devices()).await.unwrap();
    let ids: Vec<&str> = devices.iter().map(|(p, _)| p.id()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[tokio::test]
async fn test_subscribe_reports_existing_then_live_changes() {
    let store = MemoryStore::new();
    let existing = paths::command("dev-1", "c1").unwrap();
    store.set(&existing, write(json!({"n": 1}))).await.unwrap();

    let mut sub = store.subscribe(&paths::commands("dev-1").unwrap()).await.unwrap();
    let initial = sub.next().await.unwrap();
    assert_eq!(initial.len(), 1);
    assert_eq!(initial[0].kind, ChangeKind::Added);
    assert_eq!(initial[0].id(), "c1");

    let added = paths::command("dev-1", "c2").unwrap();
    store.set(&added, write(json!({"n": 2}))).await.unwrap();
    store.delete(&existing).await.unwrap();

    let batch = sub.next().await.unwrap();
    assert_eq!((batch[0].kind, batch[0].id()), (ChangeKind::Added, "c2"));
    let batch = sub.next().await.unwrap();
    assert_eq!((batch[0].kind, batch[0].id()), (ChangeKind::Removed, "c1"));
}

#[tokio::test]
async fn test_subscription_ignores_other_collections() {
    let store = MemoryStore::new();
    let mut sub = store.subscribe(&paths::commands("dev-1").unwrap()).await.unwrap();
    store
        .set(&paths::command("dev-2", "c1").unwrap(), write(json!({})))
        .await
        .unwrap();
    store
        .set(&paths::command("dev-1", "c2").unwrap(), write(json!({})))
        .await
        .unwrap();
    let batch = sub.next().await.unwrap();
    assert_eq!(batch[0].id(), "c2");
}

#[tokio::test]
async fn test_cancel_is_synchronous_and_idempotent() {
    let store = MemoryStore::new();
    let mut sub = store.subscribe(&paths::commands("dev-1").unwrap()).await.unwrap();
    let handle = sub.cancel_handle();
    assert_eq!(store.subscriber_count(), 1);

    handle.cancel();
    assert_eq!(store.subscriber_count(), 0);
    handle.cancel();
    sub.cancel();
    assert!(sub.is_cancelled());
    assert!(sub.next().await.is_none());
}

#[tokio::test]
async fn test_dropping_subscription_unregisters() {
    let store = MemoryStore::new();
    {
        let _sub = store.subscribe(&paths::devices()).await.unwrap();
        assert_eq!(store.subscriber_count(), 1);
    }
    assert_eq!(store.subscriber_count(), 0);
}

#[tokio::test]
async fn test_delete_missing_is_silent() {
    let store = MemoryStore::new();
    store.delete(&paths::command("dev-1", "gone").unwrap()).await.unwrap();
    assert_eq!(store.delete_count(), 0);
}

#[tokio::test]
async fn test_offline_store_is_unavailable() {
    let store = MemoryStore::new();
    store.set_offline(true);
    let err = store.get(&paths::device("dev-1").unwrap()).await.unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)));
    store.set_offline(false);
    assert!(store.get(&paths::device("dev-1").unwrap()).await.is_ok());
}
