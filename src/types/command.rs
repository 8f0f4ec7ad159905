use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::CommandError;
use super::tab::TabId;

/// The remote-control action a command asks the target device to perform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action")]
pub enum CommandAction {
    #[serde(rename = "closeTab")]
    CloseTab {
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },
    #[serde(rename = "openTab")]
    OpenTab {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        active: Option<bool>,
    },
}

impl CommandAction {
    pub fn name(&self) -> &'static str {
        match self {
            CommandAction::CloseTab { .. } => "closeTab",
            CommandAction::OpenTab { .. } => "openTab",
        }
    }
}

/// The document stored at `devices/{deviceId}/commands/{commandId}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    #[serde(flatten)]
    pub action: CommandAction,
    /// Server-assigned epoch milliseconds at enqueue time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub from_device: String,
}

impl Command {
    pub fn new(action: CommandAction, from_device: impl Into<String>) -> Self {
        Self {
            action,
            created_at: None,
            from_device: from_device.into(),
        }
    }

    /// Decodes a raw command document.
    ///
    /// Unknown actions are reported separately from malformed known actions so
    /// the listener can log them differently; both are consumed either way.
    pub fn from_document(doc: &Map<String, Value>) -> Result<Self, CommandError> {
        let action = doc
            .get("action")
            .and_then(Value::as_str)
            .ok_or_else(|| CommandError::Malformed("missing action".to_string()))?;

        match action {
            "closeTab" | "openTab" => serde_json::from_value(Value::Object(doc.clone()))
                .map_err(|e| CommandError::Malformed(format!("{}: {}", action, e))),
            other => Err(CommandError::UnknownAction(other.to_string())),
        }
    }
}
