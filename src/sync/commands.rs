//! Per-device command queue: enqueue, listen, execute, acknowledge.
//!
//! A command lives at `devices/{target}/commands/{id}`. Any device may insert
//! one; only the target device reads it, and deleting it is the only
//! acknowledgment. Commands are never retried.

use std::sync::Arc;

use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::browser::BrowserHost;
use crate::store::{paths, CancelHandle, ChangeKind, DocPath, Document, DocumentStore, DocumentWrite};
use crate::types::command::{Command, CommandAction};
use crate::types::errors::{CommandError, StoreError, TabError};

/// Inserts a command into `target_device_id`'s queue. Returns the command id.
///
/// Success means the command was enqueued, not that it was executed.
pub async fn enqueue_command(
    store: &dyn DocumentStore,
    target_device_id: &str,
    action: CommandAction,
    from_device: &str,
) -> Result<String, StoreError> {
    let command_id = Uuid::new_v4().simple().to_string();
    let path = paths::command(target_device_id, &command_id)?;
    let write = DocumentWrite::from_serializable(&Command::new(action, from_device))?
        .with_server_timestamp("createdAt");
    store.set(&path, write).await?;
    info!(target_device = target_device_id, command_id = %command_id, "Command enqueued");
    Ok(command_id)
}

/// Applies one command to the local browser.
pub async fn execute_command(browser: &dyn BrowserHost, command: &Command) -> Result<(), TabError> {
    match &command.action {
        CommandAction::CloseTab { tab_id } => browser.remove_tab(*tab_id).await,
        CommandAction::OpenTab { url, active, .. } => {
            browser.create_tab(url, active.unwrap_or(false)).await
        }
    }
}

/// What happened to a consumed command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Executed,
    /// The local action failed; the command was still consumed.
    Failed(TabError),
    /// Unknown or malformed; consumed without any browser action.
    Ignored(CommandError),
}

/// Decodes, executes and deletes one command document.
pub async fn process_command(
    store: &dyn DocumentStore,
    browser: &dyn BrowserHost,
    path: &DocPath,
    data: &Document,
) -> CommandOutcome {
    let outcome = match Command::from_document(data) {
        Ok(command) => match execute_command(browser, &command).await {
            Ok(()) => {
                info!(
                    command_id = path.id(),
                    action = command.action.name(),
                    from_device = %command.from_device,
                    "Command executed"
                );
                CommandOutcome::Executed
            }
            Err(e) => {
                warn!(
                    command_id = path.id(),
                    action = command.action.name(),
                    error = %e,
                    "Command action failed"
                );
                CommandOutcome::Failed(e)
            }
        },
        Err(e) => {
            warn!(command_id = path.id(), error = %e, "Ignoring unrecognized command");
            CommandOutcome::Ignored(e)
        }
    };

    if let Err(e) = store.delete(path).await {
        warn!(command_id = path.id(), error = %e, "Failed to delete consumed command");
    }
    outcome
}

/// Live listener on one device's command queue.
///
/// Every newly added command is processed on its own task; modifications and
/// removals are ignored. Stopping cancels the subscription synchronously so no
/// further commands are picked up for this identity.
pub struct CommandListener {
    device_id: String,
    cancel: CancelHandle,
    task: JoinHandle<()>,
}

impl CommandListener {
    pub async fn start(
        store: Arc<dyn DocumentStore>,
        browser: Arc<dyn BrowserHost>,
        device_id: &str,
    ) -> Result<Self, StoreError> {
        let collection = paths::commands(device_id)?;
        let mut subscription = store.subscribe(&collection).await?;
        let cancel = subscription.cancel_handle();
        info!(device_id, "Listening for commands");

        let task = tokio::spawn(async move {
            while let Some(batch) = subscription.next().await {
                for change in batch {
                    if change.kind != ChangeKind::Added {
                        continue;
                    }
                    let store = Arc::clone(&store);
                    let browser = Arc::clone(&browser);
                    tokio::spawn(async move {
                        process_command(store.as_ref(), browser.as_ref(), &change.path, &change.data)
                            .await;
                    });
                }
            }
        });

        Ok(Self {
            device_id: device_id.to_string(),
            cancel,
            task,
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn stop(&self) {
        self.cancel.cancel();
        self.task.abort();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for CommandListener {
    fn drop(&mut self) {
        self.stop();
    }
}
