//! In-process document store with live subscriptions.
//!
//! Behaves like the hosted store from a client's point of view: per-document
//! atomic writes, a monotonic server clock, and push notifications to every
//! open subscription on a collection. Used by the demo binary and the tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use super::{
    ChangeEvent, ChangeKind, CollectionPath, DocPath, Document, DocumentStore, DocumentWrite,
    Subscription,
};
use crate::types::errors::StoreError;

struct Subscriber {
    collection: CollectionPath,
    tx: mpsc::UnboundedSender<Vec<ChangeEvent>>,
}

#[derive(Default)]
struct Inner {
    docs: BTreeMap<DocPath, Document>,
    subscribers: HashMap<u64, Subscriber>,
    next_subscriber: u64,
    clock: i64,
    writes: HashMap<DocPath, usize>,
    deletes: usize,
    offline: bool,
}

impl Inner {
    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline {
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }
        Ok(())
    }

    fn server_now(&mut self) -> i64 {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64;
        self.clock = wall.max(self.clock + 1);
        self.clock
    }

    fn notify(&mut self, event: ChangeEvent) {
        let collection = event.path.parent();
        self.subscribers.retain(|_, sub| {
            if sub.collection != collection {
                return true;
            }
            sub.tx.send(vec![event.clone()]).is_ok()
        });
    }
}

/// Shared in-memory store. Clone the `Arc` to share one store between devices.
#[derive(Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Makes every subsequent operation fail with `StoreError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Number of successful writes to `path` so far.
    pub fn write_count(&self, path: &DocPath) -> usize {
        self.lock().writes.get(path).copied().unwrap_or(0)
    }

    /// Number of successful deletes across all paths.
    pub fn delete_count(&self) -> usize {
        self.lock().deletes
    }

    /// Number of open subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Reads a document without going through the async trait.
    pub fn peek(&self, path: &DocPath) -> Option<Document> {
        self.lock().docs.get(path).cloned()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn set(&self, path: &DocPath, write: DocumentWrite) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.check_online()?;

        let now = inner.server_now();
        let existing = inner.docs.get(path).cloned();
        let kind = if existing.is_some() {
            ChangeKind::Modified
        } else {
            ChangeKind::Added
        };

        let mut doc = match (write.merge, existing) {
            (true, Some(doc)) => doc,
            _ => Document::new(),
        };
        for (name, value) in write.fields {
            doc.insert(name, value);
        }
        for name in write.server_timestamps {
            doc.insert(name, Value::from(now));
        }

        inner.docs.insert(path.clone(), doc.clone());
        *inner.writes.entry(path.clone()).or_insert(0) += 1;
        inner.notify(ChangeEvent {
            kind,
            path: path.clone(),
            data: doc,
        });
        Ok(())
    }

    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        let inner = self.lock();
        inner.check_online()?;
        Ok(inner.docs.get(path).cloned())
    }

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.check_online()?;
        if let Some(doc) = inner.docs.remove(path) {
            inner.deletes += 1;
            inner.notify(ChangeEvent {
                kind: ChangeKind::Removed,
                path: path.clone(),
                data: doc,
            });
        }
        Ok(())
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<(DocPath, Document)>, StoreError> {
        let inner = self.lock();
        inner.check_online()?;
        Ok(inner
            .docs
            .iter()
            .filter(|(path, _)| path.parent() == *collection)
            .map(|(path, doc)| (path.clone(), doc.clone()))
            .collect())
    }

    async fn subscribe(&self, collection: &CollectionPath) -> Result<Subscription, StoreError> {
        let mut inner = self.lock();
        inner.check_online()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let initial: Vec<ChangeEvent> = inner
            .docs
            .iter()
            .filter(|(path, _)| path.parent() == *collection)
            .map(|(path, doc)| ChangeEvent {
                kind: ChangeKind::Added,
                path: path.clone(),
                data: doc.clone(),
            })
            .collect();
        if !initial.is_empty() {
            let _ = tx.send(initial);
        }

        let id = inner.next_subscriber;
        inner.next_subscriber += 1;
        inner.subscribers.insert(
            id,
            Subscriber {
                collection: collection.clone(),
                tx,
            },
        );

        let registry = Arc::clone(&self.inner);
        Ok(Subscription::new(rx, move || {
            registry
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .subscribers
                .remove(&id);
        }))
    }
}
