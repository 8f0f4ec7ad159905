//! Remote document store abstraction.
//!
//! The sync engine talks to the shared cloud database only through the
//! [`DocumentStore`] trait. [`memory::MemoryStore`] is an in-process
//! implementation; [`firestore::FirestoreStore`] speaks the Cloud Firestore
//! REST API.

#[cfg(feature = "rest")]
pub mod firestore;
pub mod memory;
pub mod paths;
pub mod subscription;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::types::config::StoreConfig;
use crate::types::errors::StoreError;

pub use paths::{CollectionPath, DocPath};
pub use subscription::{CancelHandle, Subscription};

/// A schema-less document body.
pub type Document = Map<String, Value>;

/// A document write: plain fields, fields to fill from the server clock, and
/// whether untouched top-level fields of an existing document survive.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentWrite {
    pub fields: Document,
    pub server_timestamps: Vec<String>,
    pub merge: bool,
}

impl DocumentWrite {
    pub fn new(fields: Document) -> Self {
        Self {
            fields,
            server_timestamps: Vec::new(),
            merge: false,
        }
    }

    /// Builds a write from any serializable struct that encodes to an object.
    pub fn from_serializable<T: Serialize>(value: &T) -> Result<Self, StoreError> {
        match serde_json::to_value(value)? {
            Value::Object(fields) => Ok(Self::new(fields)),
            other => Err(StoreError::Serialization(format!(
                "document must be an object, got {}",
                other
            ))),
        }
    }

    pub fn with_field(mut self, name: &str, value: Value) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    /// Marks `name` to be set to the store's clock at write time.
    pub fn with_server_timestamp(mut self, name: &str) -> Self {
        self.fields.remove(name);
        self.server_timestamps.push(name.to_string());
        self
    }

    pub fn merged(mut self) -> Self {
        self.merge = true;
        self
    }

    /// Every top-level field this write touches.
    pub fn field_names(&self) -> Vec<String> {
        self.fields
            .keys()
            .cloned()
            .chain(self.server_timestamps.iter().cloned())
            .collect()
    }
}

/// What happened to a document in a subscribed collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// One document change pushed to a subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub path: DocPath,
    pub data: Document,
}

impl ChangeEvent {
    pub fn id(&self) -> &str {
        self.path.id()
    }
}

/// The four operations the sync core needs from the remote store, plus a
/// collection listing for the device registry.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn set(&self, path: &DocPath, write: DocumentWrite) -> Result<(), StoreError>;
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError>;
    async fn delete(&self, path: &DocPath) -> Result<(), StoreError>;
    async fn list(&self, collection: &CollectionPath) -> Result<Vec<(DocPath, Document)>, StoreError>;
    async fn subscribe(&self, collection: &CollectionPath) -> Result<Subscription, StoreError>;
}

/// Builds a store client from a configuration blob.
///
/// Reconfiguration discards the old client and asks the factory for a new one.
pub trait StoreFactory: Send + Sync {
    fn connect(&self, config: &StoreConfig) -> Result<Arc<dyn DocumentStore>, StoreError>;
}

impl<F> StoreFactory for F
where
    F: Fn(&StoreConfig) -> Result<Arc<dyn DocumentStore>, StoreError> + Send + Sync,
{
    fn connect(&self, config: &StoreConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
        self(config)
    }
}
