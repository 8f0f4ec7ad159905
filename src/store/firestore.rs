//! Cloud Firestore REST driver.
//!
//! Writes go through `documents:commit` so server timestamps and field masks
//! apply atomically. Live subscriptions are emulated by polling the collection
//! and diffing document `updateTime`s.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use serde_json::{json, Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::{
    ChangeEvent, ChangeKind, CollectionPath, DocPath, Document, DocumentStore, DocumentWrite,
    StoreFactory, Subscription,
};
use crate::types::config::StoreConfig;
use crate::types::errors::StoreError;
use crate::types::settings::MIN_POLL_INTERVAL_MS;

const API_ROOT: &str = "https://firestore.googleapis.com/v1";
const PAGE_SIZE: u32 = 300;
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(MIN_POLL_INTERVAL_MS);

/// Firestore client for one project.
pub struct FirestoreStore {
    http: reqwest::Client,
    api_root: String,
    project_id: String,
    api_key: Zeroizing<String>,
    poll_interval: Duration,
}

impl FirestoreStore {
    pub fn new(config: &StoreConfig, poll_interval: Duration) -> Result<Self, StoreError> {
        config
            .validate()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self {
            http,
            api_root: API_ROOT.to_string(),
            project_id: config.project_id.clone(),
            api_key: Zeroizing::new(config.api_key.clone()),
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
        })
    }

    /// Points the client at a different endpoint, e.g. the local emulator.
    pub fn with_api_root(mut self, api_root: impl Into<String>) -> Self {
        self.api_root = api_root.into();
        self
    }

    fn database_name(&self) -> String {
        format!("projects/{}/databases/(default)", self.project_id)
    }

    fn document_name(&self, path: &str) -> String {
        format!("{}/documents/{}", self.database_name(), path)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_root, self.document_name(path))
    }

    fn commit_url(&self) -> String {
        format!("{}/{}/documents:commit", self.api_root, self.database_name())
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let response = request
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(response)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(StoreError::Http {
            status: status.as_u16(),
            message,
        })
    }

    async fn list_raw(&self, collection: &CollectionPath) -> Result<Vec<RawDocument>, StoreError> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .http
                .get(self.url(collection.as_str()))
                .query(&[("pageSize", PAGE_SIZE.to_string())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let response = Self::check(self.send(request).await?).await?;
            let body: Value = response
                .json()
                .await
                .map_err(|e| StoreError::Serialization(e.to_string()))?;

            if let Some(items) = body.get("documents").and_then(Value::as_array) {
                for item in items {
                    documents.push(RawDocument::from_json(item, &self.database_name())?);
                }
            }
            page_token = body
                .get("nextPageToken")
                .and_then(Value::as_str)
                .map(str::to_string);
            if page_token.is_none() {
                break;
            }
        }
        Ok(documents)
    }
}

/// A document as returned by the REST API, decoded to plain JSON.
struct RawDocument {
    path: DocPath,
    data: Document,
    update_time: String,
}

impl RawDocument {
    fn from_json(item: &Value, database_name: &str) -> Result<Self, StoreError> {
        let name = item
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::Serialization("document without name".to_string()))?;
        let prefix = format!("{}/documents/", database_name);
        let relative = name.strip_prefix(&prefix).unwrap_or(name);
        let path = DocPath::parse(relative)?;
        let data = match item.get("fields") {
            Some(Value::Object(fields)) => decode_fields(fields)?,
            _ => Document::new(),
        };
        let update_time = item
            .get("updateTime")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(Self {
            path,
            data,
            update_time,
        })
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn set(&self, path: &DocPath, write: DocumentWrite) -> Result<(), StoreError> {
        let mut op = json!({
            "update": {
                "name": self.document_name(path.as_str()),
                "fields": encode_fields(&write.fields),
            }
        });
        if write.merge {
            let field_paths: Vec<String> = write.fields.keys().cloned().collect();
            op["updateMask"] = json!({ "fieldPaths": field_paths });
        }
        if !write.server_timestamps.is_empty() {
            let transforms: Vec<Value> = write
                .server_timestamps
                .iter()
                .map(|field| json!({ "fieldPath": field, "setToServerValue": "REQUEST_TIME" }))
                .collect();
            op["updateTransforms"] = Value::Array(transforms);
        }

        let request = self
            .http
            .post(self.commit_url())
            .json(&json!({ "writes": [op] }));
        Self::check(self.send(request).await?).await?;
        debug!(path = %path, "Firestore commit ok");
        Ok(())
    }

    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        let response = self.send(self.http.get(self.url(path.as_str()))).await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: Value = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(Some(RawDocument::from_json(&body, &self.database_name())?.data))
    }

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError> {
        let response = self.send(self.http.delete(self.url(path.as_str()))).await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<(DocPath, Document)>, StoreError> {
        Ok(self
            .list_raw(collection)
            .await?
            .into_iter()
            .map(|doc| (doc.path, doc.data))
            .collect())
    }

    async fn subscribe(&self, collection: &CollectionPath) -> Result<Subscription, StoreError> {
        let poller = Arc::new(Self {
            http: self.http.clone(),
            api_root: self.api_root.clone(),
            project_id: self.project_id.clone(),
            api_key: self.api_key.clone(),
            poll_interval: self.poll_interval,
        });
        let collection = collection.clone();
        let (tx, rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            let mut known: HashMap<DocPath, String> = HashMap::new();
            let mut ticker = tokio::time::interval(poller.poll_interval);
            loop {
                ticker.tick().await;
                let docs = match poller.list_raw(&collection).await {
                    Ok(docs) => docs,
                    Err(e) => {
                        warn!(collection = %collection, error = %e, "Subscription poll failed");
                        continue;
                    }
                };
                let batch = diff_snapshot(&mut known, docs);
                if !batch.is_empty() && tx.send(batch).is_err() {
                    break;
                }
            }
        });

        Ok(Subscription::new(rx, move || task.abort()))
    }
}

/// Turns a fresh listing into change events against the last seen listing.
fn diff_snapshot(known: &mut HashMap<DocPath, String>, docs: Vec<RawDocument>) -> Vec<ChangeEvent> {
    let mut batch = Vec::new();
    let mut seen: HashMap<DocPath, String> = HashMap::with_capacity(docs.len());

    for doc in docs {
        let kind = match known.get(&doc.path) {
            None => Some(ChangeKind::Added),
            Some(previous) if *previous != doc.update_time => Some(ChangeKind::Modified),
            Some(_) => None,
        };
        seen.insert(doc.path.clone(), doc.update_time);
        if let Some(kind) = kind {
            batch.push(ChangeEvent {
                kind,
                path: doc.path,
                data: doc.data,
            });
        }
    }

    for path in known.keys() {
        if !seen.contains_key(path) {
            batch.push(ChangeEvent {
                kind: ChangeKind::Removed,
                path: path.clone(),
                data: Document::new(),
            });
        }
    }

    *known = seen;
    batch
}

/// Connects [`FirestoreStore`] clients with a fixed poll interval.
pub struct FirestoreFactory {
    pub poll_interval: Duration,
}

impl StoreFactory for FirestoreFactory {
    fn connect(&self, config: &StoreConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
        Ok(Arc::new(FirestoreStore::new(config, self.poll_interval)?))
    }
}

// === Value codec ===

pub fn encode_fields(fields: &Map<String, Value>) -> Value {
    let encoded: Map<String, Value> = fields
        .iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect();
    Value::Object(encoded)
}

/// Plain JSON to Firestore's typed value encoding.
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

pub fn decode_fields(fields: &Map<String, Value>) -> Result<Map<String, Value>, StoreError> {
    fields
        .iter()
        .map(|(k, v)| Ok((k.clone(), decode_value(v)?)))
        .collect()
}

/// Firestore's typed value encoding to plain JSON. Timestamps become epoch
/// milliseconds.
pub fn decode_value(value: &Value) -> Result<Value, StoreError> {
    let obj = value
        .as_object()
        .ok_or_else(|| StoreError::Serialization(format!("not a typed value: {}", value)))?;
    let (kind, inner) = obj
        .iter()
        .next()
        .ok_or_else(|| StoreError::Serialization("empty typed value".to_string()))?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => Ok(inner.clone()),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                Value::Number(n) => n.as_i64(),
                _ => None,
            };
            parsed
                .map(Value::from)
                .ok_or_else(|| StoreError::Serialization(format!("bad integerValue {}", inner)))
        }
        "doubleValue" => Ok(inner.clone()),
        "stringValue" | "referenceValue" | "bytesValue" => Ok(inner.clone()),
        "timestampValue" => {
            let text = inner.as_str().unwrap_or_default();
            let parsed = DateTime::parse_from_rfc3339(text)
                .map_err(|e| StoreError::Serialization(format!("bad timestamp {}: {}", text, e)))?;
            Ok(Value::from(parsed.timestamp_millis()))
        }
        "arrayValue" => {
            let items = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect::<Result<Vec<_>, _>>())
                .transpose()?
                .unwrap_or_default();
            Ok(Value::Array(items))
        }
        "mapValue" => match inner.get("fields") {
            Some(Value::Object(fields)) => Ok(Value::Object(decode_fields(fields)?)),
            _ => Ok(Value::Object(Map::new())),
        },
        "geoPointValue" => Ok(inner.clone()),
        other => Err(StoreError::Serialization(format!("unsupported value type {}", other))),
    }
}
