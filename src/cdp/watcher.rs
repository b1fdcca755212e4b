//! Turns DevTools target and page events into [`BrowserEvent`]s.
//!
//! Every page target gets a watcher session with the Page domain enabled.
//! Main-frame loading notifications on that session become tab updates;
//! destroyed targets become tab removals.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use super::connection::{CdpError, CdpEvent, CdpTransport};
use super::session::{attach_to_target, CdpEmulationSession};
use super::targets::TabRegistry;
use crate::events::{BrowserEvent, LoadStatus};
use crate::scheme::TabId;
use crate::store::OverrideMap;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    pub target_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
}

impl TargetInfo {
    fn is_page(&self) -> bool {
        self.kind == "page"
    }
}

/// Known tab as shown by the console
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabSummary {
    pub tab: TabId,
    pub url: String,
    pub title: String,
}

struct Watched {
    tab: TabId,
    target_id: String,
}

pub struct TabWatcher {
    transport: Arc<dyn CdpTransport>,
    registry: Arc<TabRegistry>,
    emulation: Arc<CdpEmulationSession>,
    events: mpsc::Sender<BrowserEvent>,
    /// Watcher session id -> watched target
    watched: Mutex<HashMap<String, Watched>>,
    /// Target id -> latest info
    targets: Mutex<HashMap<String, TargetInfo>>,
}

impl TabWatcher {
    pub fn new(
        transport: Arc<dyn CdpTransport>,
        registry: Arc<TabRegistry>,
        emulation: Arc<CdpEmulationSession>,
        events: mpsc::Sender<BrowserEvent>,
    ) -> Self {
        Self {
            transport,
            registry,
            emulation,
            events,
            watched: Mutex::new(HashMap::new()),
            targets: Mutex::new(HashMap::new()),
        }
    }

    /// Discover existing page targets and start watching them
    ///
    /// `overrides` are the tabs persisted as forced. Their ids are never
    /// handed to new targets. Those still open are reported as loading so
    /// their emulation is applied to this connection; the rest, like tabs
    /// remembered from an earlier run whose target no longer exists, are
    /// reported as removed.
    pub async fn start(&self, overrides: &OverrideMap) -> Result<(), CdpError> {
        if let Some(highest) = overrides.keys().next_back() {
            self.registry.reserve_through(*highest).await;
        }

        self.transport
            .send("Target.setDiscoverTargets", json!({ "discover": true }), None)
            .await?;
        let response = self
            .transport
            .send("Target.getTargets", json!({}), None)
            .await?;
        let infos: Vec<TargetInfo> = response
            .get("targetInfos")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| CdpError::UnexpectedResponse(e.to_string()))?
            .unwrap_or_default();

        let pages: Vec<TargetInfo> = infos.into_iter().filter(TargetInfo::is_page).collect();
        let live: HashSet<String> = pages.iter().map(|t| t.target_id.clone()).collect();
        let vanished = self.registry.retain_live(&live).await;
        for tab in &vanished {
            tracing::info!(tab = %tab, "Tab closed while not running");
            self.emit(BrowserEvent::TabRemoved(*tab)).await;
        }

        for info in pages {
            self.watch(info).await;
        }

        for &tab in overrides.keys() {
            if vanished.contains(&tab) {
                continue;
            }
            if self.registry.target_for(tab).is_some() {
                tracing::debug!(tab = %tab, "Restoring override of open tab");
                self.emit(BrowserEvent::TabUpdated {
                    tab,
                    status: LoadStatus::Loading,
                })
                .await;
            } else {
                tracing::info!(tab = %tab, "Dropping override of unknown tab");
                self.emit(BrowserEvent::TabRemoved(tab)).await;
            }
        }
        Ok(())
    }

    /// Tabs currently known, ordered by id
    pub fn tabs(&self) -> Vec<TabSummary> {
        let targets = self.targets.lock();
        self.registry
            .entries()
            .into_iter()
            .map(|(tab, target_id)| {
                let info = targets.get(&target_id);
                TabSummary {
                    tab,
                    url: info.map(|i| i.url.clone()).unwrap_or_default(),
                    title: info.map(|i| i.title.clone()).unwrap_or_default(),
                }
            })
            .collect()
    }

    async fn emit(&self, event: BrowserEvent) {
        if self.events.send(event).await.is_err() {
            tracing::debug!(?event, "Event feed closed");
        }
    }

    async fn watch(&self, info: TargetInfo) {
        let target_id = info.target_id.clone();
        // Discovery replays targetCreated for targets getTargets also lists
        let already_known = self
            .targets
            .lock()
            .insert(target_id.clone(), info)
            .is_some();
        if already_known {
            return;
        }
        let tab = self.registry.tab_for(&target_id).await;

        let session_id = match attach_to_target(self.transport.as_ref(), &target_id).await {
            Ok(session_id) => session_id,
            Err(e) => {
                tracing::warn!(tab = %tab, error = %e, "Failed to watch tab");
                return;
            }
        };
        self.watched.lock().insert(
            session_id.clone(),
            Watched {
                tab,
                target_id: target_id.clone(),
            },
        );
        if let Err(e) = self
            .transport
            .send("Page.enable", json!({}), Some(&session_id))
            .await
        {
            tracing::warn!(tab = %tab, error = %e, "Failed to enable page events");
        }
        tracing::debug!(tab = %tab, target = %target_id, "Watching tab");
    }

    fn target_info(params: &Value) -> Option<TargetInfo> {
        serde_json::from_value(params.get("targetInfo")?.clone()).ok()
    }

    /// Translate one DevTools event
    pub async fn handle_event(&self, event: CdpEvent) {
        match event.method.as_str() {
            "Target.targetCreated" => {
                if let Some(info) = Self::target_info(&event.params).filter(TargetInfo::is_page) {
                    self.watch(info).await;
                }
            }
            "Target.targetInfoChanged" => {
                if let Some(info) = Self::target_info(&event.params) {
                    let mut targets = self.targets.lock();
                    if let Some(known) = targets.get_mut(&info.target_id) {
                        *known = info;
                    }
                }
            }
            "Target.targetDestroyed" => {
                let Some(target_id) = event.params.get("targetId").and_then(Value::as_str) else {
                    return;
                };
                self.targets.lock().remove(target_id);
                self.watched.lock().retain(|_, w| w.target_id != target_id);
                if let Some(tab) = self.registry.remove(target_id).await {
                    self.emulation.forget(tab);
                    self.emit(BrowserEvent::TabRemoved(tab)).await;
                }
            }
            "Target.detachedFromTarget" => {
                if let Some(session_id) = event.params.get("sessionId").and_then(Value::as_str) {
                    self.watched.lock().remove(session_id);
                    self.emulation.forget_session(session_id);
                }
            }
            "Page.frameStartedLoading" | "Page.frameStoppedLoading" => {
                let status = if event.method == "Page.frameStartedLoading" {
                    LoadStatus::Loading
                } else {
                    LoadStatus::Complete
                };
                if let Some(tab) = self.main_frame_tab(&event) {
                    self.emit(BrowserEvent::TabUpdated { tab, status }).await;
                }
            }
            _ => {}
        }
    }

    /// Tab whose main frame the event is about, if any
    fn main_frame_tab(&self, event: &CdpEvent) -> Option<TabId> {
        let session_id = event.session_id.as_deref()?;
        let frame_id = event.params.get("frameId").and_then(Value::as_str)?;
        let watched = self.watched.lock();
        let entry = watched.get(session_id)?;
        // The main frame of a page target shares the target's id
        (entry.target_id == frame_id).then_some(entry.tab)
    }

    /// Process events until the connection closes or `cancel` fires
    pub async fn run(&self, mut events: broadcast::Receiver<CdpEvent>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Ok(event) => self.handle_event(event).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "Dropped DevTools events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    }
}
