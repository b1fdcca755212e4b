//! Mapping between DevTools target ids and integer tab ids.
//!
//! Every new page target gets a fresh [`TabId`]; ids are never handed out
//! twice. The mapping is persisted so a restarted process keeps addressing
//! the same tabs of a browser that kept running.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::data::KeyValueStore;
use crate::error::StoreError;
use crate::scheme::TabId;

/// Key of the persisted registry record
pub const REGISTRY_KEY: &str = "tab_registry";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegistryState {
    next_id: u32,
    targets: BTreeMap<String, TabId>,
}

impl Default for RegistryState {
    fn default() -> Self {
        Self {
            next_id: 1,
            targets: BTreeMap::new(),
        }
    }
}

pub struct TabRegistry {
    state: Mutex<RegistryState>,
    kv: Option<Arc<dyn KeyValueStore>>,
}

impl TabRegistry {
    /// Registry that is never persisted
    pub fn in_memory() -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            kv: None,
        }
    }

    /// Load the registry persisted in `kv`, or start empty
    pub async fn load(kv: Arc<dyn KeyValueStore>) -> Result<Self, StoreError> {
        let state = match kv.get(REGISTRY_KEY).await? {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Discarding unreadable tab registry");
                RegistryState::default()
            }),
            None => RegistryState::default(),
        };
        Ok(Self {
            state: Mutex::new(state),
            kv: Some(kv),
        })
    }

    async fn persist(&self) {
        let Some(kv) = &self.kv else {
            return;
        };
        let snapshot = self.state.lock().clone();
        let result = match serde_json::to_string(&snapshot) {
            Ok(raw) => kv.set(REGISTRY_KEY, &raw).await,
            Err(e) => Err(StoreError::from(e)),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to persist tab registry");
        }
    }

    /// Tab id for a target, allocating one for targets not seen before
    pub async fn tab_for(&self, target_id: &str) -> TabId {
        let (tab, allocated) = {
            let mut state = self.state.lock();
            match state.targets.get(target_id) {
                Some(tab) => (*tab, false),
                None => {
                    let tab = TabId(state.next_id);
                    state.next_id += 1;
                    state.targets.insert(target_id.to_string(), tab);
                    (tab, true)
                }
            }
        };
        if allocated {
            tracing::debug!(tab = %tab, target = target_id, "Registered tab");
            self.persist().await;
        }
        tab
    }

    /// Never allocate `tab` or any id below it
    ///
    /// Ids can outlive a lost registry record elsewhere, e.g. as keys of the
    /// override map.
    pub async fn reserve_through(&self, tab: TabId) {
        let raised = {
            let mut state = self.state.lock();
            let floor = tab.get().saturating_add(1);
            if state.next_id < floor {
                state.next_id = floor;
                true
            } else {
                false
            }
        };
        if raised {
            tracing::debug!(tab = %tab, "Reserved tab ids");
            self.persist().await;
        }
    }

    /// Tab id of a known target, without allocating
    pub fn lookup(&self, target_id: &str) -> Option<TabId> {
        self.state.lock().targets.get(target_id).copied()
    }

    pub fn target_for(&self, tab: TabId) -> Option<String> {
        self.state
            .lock()
            .targets
            .iter()
            .find(|(_, t)| **t == tab)
            .map(|(target, _)| target.clone())
    }

    /// Forget a target, returning the tab id it had
    pub async fn remove(&self, target_id: &str) -> Option<TabId> {
        let removed = self.state.lock().targets.remove(target_id);
        if removed.is_some() {
            self.persist().await;
        }
        removed
    }

    /// Drop every target not in `live`, returning the tab ids that vanished
    pub async fn retain_live(&self, live: &HashSet<String>) -> Vec<TabId> {
        let removed: Vec<TabId> = {
            let mut state = self.state.lock();
            let stale: Vec<String> = state
                .targets
                .keys()
                .filter(|target| !live.contains(*target))
                .cloned()
                .collect();
            stale
                .iter()
                .filter_map(|target| state.targets.remove(target))
                .collect()
        };
        if !removed.is_empty() {
            self.persist().await;
        }
        removed
    }

    /// All known (tab, target) pairs ordered by tab id
    pub fn entries(&self) -> Vec<(TabId, String)> {
        let mut entries: Vec<(TabId, String)> = self
            .state
            .lock()
            .targets
            .iter()
            .map(|(target, tab)| (*tab, target.clone()))
            .collect();
        entries.sort();
        entries
    }
}
