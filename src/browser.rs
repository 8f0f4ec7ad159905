//! Host browser seam.
//!
//! The sync core reads tabs, opens and closes them, and listens for tab
//! lifecycle events only through [`BrowserHost`].

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::types::errors::TabError;
use crate::types::tab::{BrowserTab, TabEvent, TabId};

#[async_trait]
pub trait BrowserHost: Send + Sync {
    /// Every open tab, ordered by window then index.
    async fn list_tabs(&self) -> Result<Vec<BrowserTab>, TabError>;
    async fn create_tab(&self, url: &str, active: bool) -> Result<(), TabError>;
    async fn remove_tab(&self, tab_id: TabId) -> Result<(), TabError>;
    /// A fresh receiver for tab lifecycle events.
    fn subscribe_events(&self) -> broadcast::Receiver<TabEvent>;
}
