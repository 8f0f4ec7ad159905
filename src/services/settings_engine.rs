//! Settings file for the sync engine.
//!
//! `settings.json` lives in the platform config directory unless a path is
//! given. Keys are addressed as `section.field`, e.g. `sync.debounce_ms`, and
//! every accepted change is validated and written back immediately.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::platform;
use crate::types::errors::SettingsError;
use crate::types::settings::EngineSettings;

const SETTINGS_FILE: &str = "settings.json";

pub trait SettingsEngineTrait {
    fn load(&mut self) -> Result<EngineSettings, SettingsError>;
    fn save(&self) -> Result<(), SettingsError>;
    fn get_settings(&self) -> &EngineSettings;
    fn set_value(&mut self, key: &str, value: Value) -> Result<(), SettingsError>;
    fn reset(&mut self) -> Result<(), SettingsError>;
    fn get_config_path(&self) -> &Path;
}

pub struct SettingsEngine {
    path: PathBuf,
    settings: EngineSettings,
}

impl SettingsEngine {
    /// Uses `path_override` when given, otherwise `settings.json` in the
    /// platform config directory.
    pub fn new(path_override: Option<PathBuf>) -> Self {
        let path = path_override.unwrap_or_else(|| platform::get_config_dir().join(SETTINGS_FILE));
        Self {
            path,
            settings: EngineSettings::default(),
        }
    }
}

/// Splits `sync.debounce_ms` into a JSON pointer `/sync/debounce_ms`.
/// Only two-level keys exist.
fn key_pointer(key: &str) -> Result<String, SettingsError> {
    match key.split_once('.') {
        Some((section, field))
            if !section.is_empty() && !field.is_empty() && !field.contains('.') =>
        {
            Ok(format!("/{}/{}", section, field))
        }
        _ => Err(SettingsError::InvalidKey(format!(
            "'{}' is not a section.field key",
            key
        ))),
    }
}

impl SettingsEngineTrait for SettingsEngine {
    /// A missing file yields defaults. A file that does not parse or holds
    /// out-of-range values is an error.
    fn load(&mut self) -> Result<EngineSettings, SettingsError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No settings file, using defaults");
                self.settings = EngineSettings::default();
                return Ok(self.settings.clone());
            }
            Err(e) => return Err(SettingsError::IoError(format!("Failed to read settings: {}", e))),
        };

        let settings: EngineSettings = serde_json::from_str(&content)
            .map_err(|e| SettingsError::SerializationError(format!("Failed to parse settings: {}", e)))?;
        settings.validate()?;
        self.settings = settings;
        Ok(self.settings.clone())
    }

    /// Writes to a sibling temp file and renames it over the target.
    fn save(&self) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| SettingsError::IoError(format!("Failed to create config directory: {}", e)))?;
        }
        let json = serde_json::to_string_pretty(&self.settings)
            .map_err(|e| SettingsError::SerializationError(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .map_err(|e| SettingsError::IoError(format!("Failed to write settings: {}", e)))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| SettingsError::IoError(format!("Failed to replace settings: {}", e)))
    }

    fn get_settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Replaces one value, e.g. `"sync.debounce_ms"`. The in-memory settings
    /// only change if the result decodes, validates and is saved.
    fn set_value(&mut self, key: &str, value: Value) -> Result<(), SettingsError> {
        let pointer = key_pointer(key)?;
        let mut tree = serde_json::to_value(&self.settings)
            .map_err(|e| SettingsError::SerializationError(e.to_string()))?;
        let slot = tree
            .pointer_mut(&pointer)
            .ok_or_else(|| SettingsError::InvalidKey(format!("Unknown setting '{}'", key)))?;
        *slot = value;

        let updated: EngineSettings = serde_json::from_value(tree)
            .map_err(|e| SettingsError::InvalidValue(format!("{}: {}", key, e)))?;
        updated.validate()?;

        let previous = std::mem::replace(&mut self.settings, updated);
        if let Err(e) = self.save() {
            self.settings = previous;
            return Err(e);
        }
        debug!(key, "Setting updated");
        Ok(())
    }

    fn reset(&mut self) -> Result<(), SettingsError> {
        self.settings = EngineSettings::default();
        self.save()
    }

    fn get_config_path(&self) -> &Path {
        &self.path
    }
}
