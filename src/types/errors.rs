use thiserror::Error;

use super::tab::TabId;

// === TabError ===

/// Errors reported by the host browser for tab operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TabError {
    /// Tab with the given ID was not found.
    #[error("Tab not found: {0}")]
    NotFound(TabId),
    /// The provided tab index is out of bounds.
    #[error("Invalid tab index: {0}")]
    InvalidIndex(usize),
    /// The URL cannot be opened in a tab.
    #[error("Invalid tab URL: {0}")]
    InvalidUrl(String),
    /// The browser side of the bridge went away.
    #[error("Browser host unavailable: {0}")]
    HostUnavailable(String),
}

// === StoreError ===

/// Errors raised by a remote document store driver.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    /// The store could not be reached (network, quota, offline).
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    /// A document or collection path is malformed.
    #[error("Invalid store path: {0}")]
    InvalidPath(String),
    /// A document could not be encoded or decoded.
    #[error("Store serialization error: {0}")]
    Serialization(String),
    /// The store answered with an error status.
    #[error("Store request failed with status {status}: {message}")]
    Http { status: u16, message: String },
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

// === CommandError ===

/// Errors produced while decoding a command document.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommandError {
    /// The `action` field names an action this device does not know.
    #[error("Unknown command action: {0}")]
    UnknownAction(String),
    /// The document is missing fields its action requires.
    #[error("Malformed command: {0}")]
    Malformed(String),
}

// === ConfigError ===

/// Errors related to the store-access configuration blob.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// The blob is not valid JSON for a store configuration.
    #[error("Config parse error: {0}")]
    Parse(String),
    /// A required field is missing or empty.
    #[error("Missing config field: {0}")]
    MissingField(&'static str),
}

// === LocalStateError ===

/// Errors related to the local device-side state database.
#[derive(Debug, Error)]
pub enum LocalStateError {
    /// Database operation failed.
    #[error("Local state database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// A persisted value could not be decoded.
    #[error("Local state serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// === SettingsError ===

/// Errors related to engine settings management.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    #[error("Settings I/O error: {0}")]
    IoError(String),
    /// Failed to serialize or deserialize settings.
    #[error("Settings serialization error: {0}")]
    SerializationError(String),
    /// The provided settings key is invalid.
    #[error("Invalid settings key: {0}")]
    InvalidKey(String),
    /// The provided settings value is invalid.
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
}

// === AppError ===

/// Errors surfaced to the presentation layer by setup and intent operations.
#[derive(Debug, Error)]
pub enum AppError {
    /// No store configuration has been provided yet.
    #[error("Store is not configured")]
    NotConfigured,
    /// No device identity has been selected yet.
    #[error("No device selected")]
    NoDevice,
    /// The requested device is not present in the registry.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    LocalState(#[from] LocalStateError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}
