//! Validated paths into the remote document store.
//!
//! Document paths have an even number of segments (`devices/abc`), collection
//! paths an odd number (`devices`, `devices/abc/commands`).

use std::fmt;

use crate::types::errors::StoreError;

pub const DEVICES: &str = "devices";
pub const COMMANDS: &str = "commands";

fn split_segments(path: &str) -> Result<Vec<&str>, StoreError> {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(StoreError::InvalidPath(format!("empty segment in '{}'", path)));
    }
    Ok(segments)
}

fn check_id(id: &str) -> Result<(), StoreError> {
    if id.is_empty() || id.contains('/') {
        return Err(StoreError::InvalidPath(format!("invalid document id '{}'", id)));
    }
    Ok(())
}

/// Path of a single document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocPath(String);

impl DocPath {
    pub fn parse(path: &str) -> Result<Self, StoreError> {
        let segments = split_segments(path)?;
        if segments.len() % 2 != 0 {
            return Err(StoreError::InvalidPath(format!("'{}' is not a document path", path)));
        }
        Ok(Self(path.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last segment.
    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The collection this document lives in.
    pub fn parent(&self) -> CollectionPath {
        match self.0.rsplit_once('/') {
            Some((parent, _)) => CollectionPath(parent.to_string()),
            None => CollectionPath(String::new()),
        }
    }

    /// A subcollection under this document.
    pub fn collection(&self, name: &str) -> Result<CollectionPath, StoreError> {
        check_id(name)?;
        Ok(CollectionPath(format!("{}/{}", self.0, name)))
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path of a collection of documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn parse(path: &str) -> Result<Self, StoreError> {
        let segments = split_segments(path)?;
        if segments.len() % 2 != 1 {
            return Err(StoreError::InvalidPath(format!(
                "'{}' is not a collection path",
                path
            )));
        }
        Ok(Self(path.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn doc(&self, id: &str) -> Result<DocPath, StoreError> {
        check_id(id)?;
        Ok(DocPath(format!("{}/{}", self.0, id)))
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `devices`
pub fn devices() -> CollectionPath {
    CollectionPath(DEVICES.to_string())
}

/// `devices/{deviceId}`
pub fn device(device_id: &str) -> Result<DocPath, StoreError> {
    devices().doc(device_id)
}

/// `devices/{deviceId}/commands`
pub fn commands(device_id: &str) -> Result<CollectionPath, StoreError> {
    device(device_id)?.collection(COMMANDS)
}

/// `devices/{deviceId}/commands/{commandId}`
pub fn command(device_id: &str, command_id: &str) -> Result<DocPath, StoreError> {
    commands(device_id)?.doc(command_id)
}
