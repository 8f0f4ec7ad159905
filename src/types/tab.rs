use serde::{Deserialize, Serialize};

/// Local browser tab identifier. Only meaningful on the device that owns the tab.
pub type TabId = i64;

/// Load state of a live browser tab.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    #[default]
    Loading,
    Complete,
}

/// A live tab as reported by the host browser.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BrowserTab {
    pub id: TabId,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fav_icon_url: Option<String>,
    pub window_id: i64,
    pub index: usize,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub status: TabStatus,
}

/// A tab as stored inside a device document.
///
/// Snapshots have no identity across writes; a device's whole `tabs` list is
/// replaced on every write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TabSnapshot {
    pub id: TabId,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fav_icon_url: Option<String>,
    pub window_id: i64,
    pub index: usize,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub pinned: bool,
}

impl From<&BrowserTab> for TabSnapshot {
    fn from(tab: &BrowserTab) -> Self {
        Self {
            id: tab.id,
            url: tab.url.clone(),
            title: tab.title.clone(),
            fav_icon_url: tab.fav_icon_url.clone(),
            window_id: tab.window_id,
            index: tab.index,
            active: tab.active,
            pinned: tab.pinned,
        }
    }
}

/// Tab lifecycle notifications emitted by the host browser.
#[derive(Debug, Clone, PartialEq)]
pub enum TabEvent {
    Created(TabId),
    Removed(TabId),
    Updated {
        tab_id: TabId,
        url_changed: bool,
        load_complete: bool,
    },
    Moved {
        tab_id: TabId,
        to_index: usize,
    },
    Activated(TabId),
    /// The whole tab set was reloaded from the browser.
    Replaced,
}

impl TabEvent {
    /// Whether this event should schedule a snapshot write.
    ///
    /// Updates only count when the URL changed or the page finished loading;
    /// activation never counts.
    pub fn is_snapshot_relevant(&self) -> bool {
        match self {
            TabEvent::Created(_)
            | TabEvent::Removed(_)
            | TabEvent::Moved { .. }
            | TabEvent::Replaced => true,
            TabEvent::Updated {
                url_changed,
                load_complete,
                ..
            } => *url_changed || *load_complete,
            TabEvent::Activated(_) => false,
        }
    }
}
