use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::errors::ConfigError;

/// Store-access configuration blob, as pasted from the cloud console.
///
/// The API key is wiped from memory when the config is dropped.
#[derive(Clone, Serialize, Deserialize, PartialEq, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    pub api_key: String,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messaging_sender_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
}

impl StoreConfig {
    /// Parses and validates a JSON config blob.
    pub fn from_json(blob: &str) -> Result<Self, ConfigError> {
        let config: StoreConfig =
            serde_json::from_str(blob.trim()).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingField("apiKey"));
        }
        if self.project_id.trim().is_empty() {
            return Err(ConfigError::MissingField("projectId"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("api_key", &"<redacted>")
            .field("project_id", &self.project_id)
            .field("auth_domain", &self.auth_domain)
            .field("app_id", &self.app_id)
            .finish()
    }
}
