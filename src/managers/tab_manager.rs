use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};

use crate::browser::BrowserHost;
use crate::types::errors::TabError;
use crate::types::tab::{BrowserTab, TabEvent, TabId, TabStatus};

const EVENT_CAPACITY: usize = 256;
const DEFAULT_WINDOW: i64 = 1;

/// A browser action forwarded to the real browser in forwarding mode.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", content = "params")]
pub enum TabAction {
    #[serde(rename = "tabs.create")]
    Create { url: String, active: bool },
    #[serde(rename = "tabs.remove")]
    Remove {
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },
}

/// Trait defining the tab management interface.
pub trait TabManagerTrait {
    fn open_tab(&self, url: &str, active: bool) -> BrowserTab;
    fn close_tab(&self, tab_id: TabId) -> Result<(), TabError>;
    fn navigate(&self, tab_id: TabId, url: &str) -> Result<(), TabError>;
    fn complete_load(&self, tab_id: TabId, title: &str) -> Result<(), TabError>;
    fn switch_tab(&self, tab_id: TabId) -> Result<(), TabError>;
    fn move_tab(&self, tab_id: TabId, new_index: usize) -> Result<(), TabError>;
    fn pin_tab(&self, tab_id: TabId) -> Result<(), TabError>;
    fn get_tab(&self, tab_id: TabId) -> Option<BrowserTab>;
    fn get_all_tabs(&self) -> Vec<BrowserTab>;
    fn tab_count(&self) -> usize;
}

struct TabState {
    /// Ordered by window, then index.
    tabs: Vec<BrowserTab>,
    next_id: TabId,
}

impl TabState {
    fn find_tab_index(&self, tab_id: TabId) -> Option<usize> {
        self.tabs.iter().position(|t| t.id == tab_id)
    }

    fn require(&self, tab_id: TabId) -> Result<usize, TabError> {
        self.find_tab_index(tab_id).ok_or(TabError::NotFound(tab_id))
    }

    /// Count of pinned tabs in a window (they are always at the left).
    fn pinned_count(&self, window_id: i64) -> usize {
        self.tabs
            .iter()
            .filter(|t| t.window_id == window_id && t.pinned)
            .count()
    }

    /// Keeps tabs grouped by window and `index` equal to the position within
    /// the window.
    fn renumber(&mut self) {
        self.tabs.sort_by_key(|t| t.window_id);
        let mut current_window = None;
        let mut position = 0;
        for tab in &mut self.tabs {
            if current_window != Some(tab.window_id) {
                current_window = Some(tab.window_id);
                position = 0;
            }
            tab.index = position;
            position += 1;
        }
    }

    /// Moves a tab within its window to `new_index`, clamped to the window.
    fn reposition(&mut self, tab_id: TabId, new_index: usize) -> Result<(), TabError> {
        let idx = self.require(tab_id)?;
        let tab = self.tabs.remove(idx);
        let window_start = self
            .tabs
            .iter()
            .position(|t| t.window_id == tab.window_id)
            .unwrap_or(self.tabs.len());
        let window_len = self
            .tabs
            .iter()
            .filter(|t| t.window_id == tab.window_id)
            .count();
        let insert_at = window_start + new_index.min(window_len);
        self.tabs.insert(insert_at, tab);
        self.renumber();
        Ok(())
    }

    fn set_active(&mut self, tab_id: TabId) -> Result<(), TabError> {
        let idx = self.require(tab_id)?;
        let window_id = self.tabs[idx].window_id;
        for tab in self.tabs.iter_mut().filter(|t| t.window_id == window_id) {
            tab.active = tab.id == tab_id;
        }
        Ok(())
    }
}

/// In-process tab model.
///
/// Standalone, it owns tab ids and opens/closes tabs itself. In forwarding
/// mode it mirrors tabs reported by the real browser and forwards create and
/// remove requests as [`TabAction`]s.
pub struct TabManager {
    state: Mutex<TabState>,
    events: broadcast::Sender<TabEvent>,
    sink: Option<mpsc::UnboundedSender<TabAction>>,
}

impl TabManager {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Mutex::new(TabState {
                tabs: Vec::new(),
                next_id: 1,
            }),
            events,
            sink: None,
        }
    }

    /// A mirror whose create/remove requests go to `sink`.
    pub fn forwarding(sink: mpsc::UnboundedSender<TabAction>) -> Self {
        Self {
            sink: Some(sink),
            ..Self::new()
        }
    }

    pub fn is_forwarding(&self) -> bool {
        self.sink.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, TabState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: TabEvent) {
        // No receivers just means nobody is syncing yet.
        let _ = self.events.send(event);
    }

    fn forward(&self, action: TabAction) -> Result<(), TabError> {
        match &self.sink {
            Some(sink) => sink
                .send(action)
                .map_err(|e| TabError::HostUnavailable(e.to_string())),
            None => Ok(()),
        }
    }

    // === Mirror feed from the real browser ===

    /// Replaces the whole tab set with what the browser reports.
    pub fn replace_all(&self, tabs: Vec<BrowserTab>) {
        {
            let mut state = self.lock();
            state.tabs = tabs;
            state.tabs.sort_by_key(|t| (t.window_id, t.index));
            let max_id = state.tabs.iter().map(|t| t.id).max().unwrap_or(0);
            state.next_id = state.next_id.max(max_id + 1);
        }
        self.emit(TabEvent::Replaced);
    }

    pub fn apply_created(&self, tab: BrowserTab) {
        let id = tab.id;
        {
            let mut state = self.lock();
            if let Some(idx) = state.find_tab_index(id) {
                state.tabs.remove(idx);
            }
            let index = tab.index;
            let window_id = tab.window_id;
            let window_start = state
                .tabs
                .iter()
                .position(|t| t.window_id == window_id)
                .unwrap_or(state.tabs.len());
            let window_len = state.tabs.iter().filter(|t| t.window_id == window_id).count();
            let insert_at = window_start + index.min(window_len);
            state.tabs.insert(insert_at, tab);
            state.renumber();
            state.next_id = state.next_id.max(id + 1);
        }
        self.emit(TabEvent::Created(id));
    }

    pub fn apply_removed(&self, tab_id: TabId) {
        let removed = {
            let mut state = self.lock();
            match state.find_tab_index(tab_id) {
                Some(idx) => {
                    state.tabs.remove(idx);
                    state.renumber();
                    true
                }
                None => false,
            }
        };
        if removed {
            self.emit(TabEvent::Removed(tab_id));
        }
    }

    /// Applies an updated tab record. `url_changed` and `load_complete`
    /// come from the browser's change info.
    pub fn apply_updated(&self, tab: BrowserTab, url_changed: bool, load_complete: bool) {
        let id = tab.id;
        {
            let mut state = self.lock();
            match state.find_tab_index(id) {
                Some(idx) => {
                    let index = state.tabs[idx].index;
                    let window_id = state.tabs[idx].window_id;
                    state.tabs[idx] = BrowserTab {
                        index,
                        window_id,
                        ..tab
                    };
                }
                None => {
                    state.tabs.push(tab);
                    state.renumber();
                }
            }
        }
        self.emit(TabEvent::Updated {
            tab_id: id,
            url_changed,
            load_complete,
        });
    }

    pub fn apply_moved(&self, tab_id: TabId, to_index: usize) -> Result<(), TabError> {
        self.lock().reposition(tab_id, to_index)?;
        self.emit(TabEvent::Moved { tab_id, to_index });
        Ok(())
    }

    pub fn apply_activated(&self, tab_id: TabId) -> Result<(), TabError> {
        self.lock().set_active(tab_id)?;
        self.emit(TabEvent::Activated(tab_id));
        Ok(())
    }
}

impl Default for TabManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TabManagerTrait for TabManager {
    /// Opens a tab at the end of the default window. Returns the new tab.
    fn open_tab(&self, url: &str, active: bool) -> BrowserTab {
        let tab = {
            let mut state = self.lock();
            let id = state.next_id;
            state.next_id += 1;
            let index = state
                .tabs
                .iter()
                .filter(|t| t.window_id == DEFAULT_WINDOW)
                .count();
            let first = state.tabs.is_empty();
            let tab = BrowserTab {
                id,
                url: url.to_string(),
                title: String::new(),
                fav_icon_url: None,
                window_id: DEFAULT_WINDOW,
                index,
                active: false,
                pinned: false,
                status: TabStatus::Loading,
            };
            state.tabs.push(tab);
            state.renumber();
            if active || first {
                let _ = state.set_active(id);
            }
            let idx = state.find_tab_index(id).unwrap_or_default();
            state.tabs[idx].clone()
        };
        self.emit(TabEvent::Created(tab.id));
        tab
    }

    /// Closes a tab. If it was active, its right neighbour (or the new last
    /// tab) in the same window becomes active.
    fn close_tab(&self, tab_id: TabId) -> Result<(), TabError> {
        {
            let mut state = self.lock();
            let idx = state.require(tab_id)?;
            let removed = state.tabs.remove(idx);
            state.renumber();

            if removed.active {
                let neighbour = state
                    .tabs
                    .iter()
                    .filter(|t| t.window_id == removed.window_id)
                    .find(|t| t.index >= removed.index)
                    .or_else(|| {
                        state
                            .tabs
                            .iter()
                            .filter(|t| t.window_id == removed.window_id)
                            .last()
                    })
                    .map(|t| t.id);
                if let Some(next) = neighbour {
                    let _ = state.set_active(next);
                }
            }
        }
        self.emit(TabEvent::Removed(tab_id));
        Ok(())
    }

    fn navigate(&self, tab_id: TabId, url: &str) -> Result<(), TabError> {
        {
            let mut state = self.lock();
            let idx = state.require(tab_id)?;
            let tab = &mut state.tabs[idx];
            tab.url = url.to_string();
            tab.status = TabStatus::Loading;
        }
        self.emit(TabEvent::Updated {
            tab_id,
            url_changed: true,
            load_complete: false,
        });
        Ok(())
    }

    fn complete_load(&self, tab_id: TabId, title: &str) -> Result<(), TabError> {
        {
            let mut state = self.lock();
            let idx = state.require(tab_id)?;
            let tab = &mut state.tabs[idx];
            tab.title = title.to_string();
            tab.status = TabStatus::Complete;
        }
        self.emit(TabEvent::Updated {
            tab_id,
            url_changed: false,
            load_complete: true,
        });
        Ok(())
    }

    fn switch_tab(&self, tab_id: TabId) -> Result<(), TabError> {
        self.apply_activated(tab_id)
    }

    /// Moves a tab to a new position in its window.
    fn move_tab(&self, tab_id: TabId, new_index: usize) -> Result<(), TabError> {
        {
            let state = self.lock();
            let idx = state.require(tab_id)?;
            let window_id = state.tabs[idx].window_id;
            let window_len = state.tabs.iter().filter(|t| t.window_id == window_id).count();
            if new_index >= window_len {
                return Err(TabError::InvalidIndex(new_index));
            }
        }
        self.apply_moved(tab_id, new_index)
    }

    /// Pins a tab, moving it to the end of its window's pinned section.
    fn pin_tab(&self, tab_id: TabId) -> Result<(), TabError> {
        let to_index = {
            let mut state = self.lock();
            let idx = state.require(tab_id)?;
            if state.tabs[idx].pinned {
                return Ok(());
            }
            let window_id = state.tabs[idx].window_id;
            let pinned_before = state.pinned_count(window_id);
            state.tabs[idx].pinned = true;
            state.reposition(tab_id, pinned_before)?;
            pinned_before
        };
        self.emit(TabEvent::Moved { tab_id, to_index });
        Ok(())
    }

    fn get_tab(&self, tab_id: TabId) -> Option<BrowserTab> {
        self.lock().tabs.iter().find(|t| t.id == tab_id).cloned()
    }

    fn get_all_tabs(&self) -> Vec<BrowserTab> {
        self.lock().tabs.clone()
    }

    fn tab_count(&self) -> usize {
        self.lock().tabs.len()
    }
}

#[async_trait]
impl BrowserHost for TabManager {
    async fn list_tabs(&self) -> Result<Vec<BrowserTab>, TabError> {
        Ok(self.get_all_tabs())
    }

    async fn create_tab(&self, url: &str, active: bool) -> Result<(), TabError> {
        if url.trim().is_empty() {
            return Err(TabError::InvalidUrl(url.to_string()));
        }
        if self.is_forwarding() {
            return self.forward(TabAction::Create {
                url: url.to_string(),
                active,
            });
        }
        self.open_tab(url, active);
        Ok(())
    }

    async fn remove_tab(&self, tab_id: TabId) -> Result<(), TabError> {
        if self.is_forwarding() {
            {
                // Held across the forward so a duplicate remove sees the tab gone.
                let mut state = self.lock();
                let idx = state.require(tab_id)?;
                self.forward(TabAction::Remove { tab_id })?;
                state.tabs.remove(idx);
                state.renumber();
            }
            self.emit(TabEvent::Removed(tab_id));
            return Ok(());
        }
        self.close_tab(tab_id)
    }

    fn subscribe_events(&self) -> broadcast::Receiver<TabEvent> {
        self.events.subscribe()
    }
}
