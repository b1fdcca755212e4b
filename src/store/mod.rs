//! Durable per-tab override map.
//!
//! The whole map is stored as one JSON object under [`OVERRIDE_KEY`]. Every
//! operation reads the full map, touches one tab's entry and writes the full
//! map back, so concurrent operations on different tabs are last-writer-wins
//! at map granularity.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::data::KeyValueStore;
use crate::error::StoreError;
use crate::scheme::{Scheme, TabId};

/// Key of the single persisted override record
pub const OVERRIDE_KEY: &str = "override";

/// Snapshot of all forced tabs
pub type OverrideMap = BTreeMap<TabId, Scheme>;

#[async_trait]
pub trait OverrideStore: Send + Sync {
    async fn get(&self, tab: TabId) -> Result<Option<Scheme>, StoreError>;
    async fn set(&self, tab: TabId, scheme: Scheme) -> Result<(), StoreError>;
    /// Remove the tab's entry. Returns whether one existed.
    async fn clear(&self, tab: TabId) -> Result<bool, StoreError>;
    async fn all(&self) -> Result<OverrideMap, StoreError>;
    async fn clear_all(&self) -> Result<(), StoreError>;
}

/// [`OverrideStore`] over any [`KeyValueStore`]
#[derive(Clone)]
pub struct KvOverrideStore {
    kv: Arc<dyn KeyValueStore>,
}

impl KvOverrideStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    async fn load(&self) -> Result<OverrideMap, StoreError> {
        let Some(raw) = self.kv.get(OVERRIDE_KEY).await? else {
            return Ok(OverrideMap::new());
        };
        match serde_json::from_str::<OverrideMap>(&raw) {
            Ok(map) => Ok(map),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable override map");
                Ok(OverrideMap::new())
            }
        }
    }

    async fn save(&self, map: &OverrideMap) -> Result<(), StoreError> {
        let raw = serde_json::to_string(map)?;
        self.kv.set(OVERRIDE_KEY, &raw).await
    }
}

#[async_trait]
impl OverrideStore for KvOverrideStore {
    async fn get(&self, tab: TabId) -> Result<Option<Scheme>, StoreError> {
        Ok(self.load().await?.get(&tab).copied())
    }

    async fn set(&self, tab: TabId, scheme: Scheme) -> Result<(), StoreError> {
        let mut map = self.load().await?;
        map.insert(tab, scheme);
        self.save(&map).await
    }

    async fn clear(&self, tab: TabId) -> Result<bool, StoreError> {
        let mut map = self.load().await?;
        if map.remove(&tab).is_none() {
            return Ok(false);
        }
        self.save(&map).await?;
        Ok(true)
    }

    async fn all(&self) -> Result<OverrideMap, StoreError> {
        self.load().await
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        self.kv.delete(OVERRIDE_KEY).await
    }
}
