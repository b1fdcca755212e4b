//! Browser event feed and dispatch into the override controller.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::controller::{OverrideController, TransitionOutcome};
use crate::error::OverrideError;
use crate::scheme::TabId;

/// Loading phase of a tab update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Loading,
    Complete,
}

/// Browser-level events relevant to color scheme overrides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserEvent {
    /// The per-tab action was activated
    ActionClicked(TabId),
    /// A tab changed loading phase
    TabUpdated { tab: TabId, status: LoadStatus },
    /// A tab was closed
    TabRemoved(TabId),
}

impl BrowserEvent {
    pub fn tab(&self) -> TabId {
        match self {
            BrowserEvent::ActionClicked(tab)
            | BrowserEvent::TabUpdated { tab, .. }
            | BrowserEvent::TabRemoved(tab) => *tab,
        }
    }
}

/// One async lock per tab, so handlers for the same tab never interleave
#[derive(Default)]
struct TabLocks {
    locks: Mutex<HashMap<TabId, Arc<tokio::sync::Mutex<()>>>>,
}

impl TabLocks {
    fn lock_for(&self, tab: TabId) -> Arc<tokio::sync::Mutex<()>> {
        self.locks.lock().entry(tab).or_default().clone()
    }

    fn forget(&self, tab: TabId) {
        self.locks.lock().remove(&tab);
    }
}

/// Routes [`BrowserEvent`]s to the controller, one task per event
#[derive(Clone)]
pub struct EventDispatcher {
    controller: Arc<OverrideController>,
    locks: Option<Arc<TabLocks>>,
    tasks: TaskTracker,
}

impl EventDispatcher {
    pub fn new(controller: Arc<OverrideController>) -> Self {
        Self {
            controller,
            locks: Some(Arc::new(TabLocks::default())),
            tasks: TaskTracker::new(),
        }
    }

    /// Enable or disable per-tab serialization of handlers
    pub fn with_serialization(mut self, serialize_per_tab: bool) -> Self {
        self.locks = serialize_per_tab.then(|| Arc::new(TabLocks::default()));
        self
    }

    /// Run the handler for one event to completion
    ///
    /// Returns `None` for events that map to no controller operation.
    pub async fn handle(
        &self,
        event: BrowserEvent,
    ) -> Option<Result<TransitionOutcome, OverrideError>> {
        let tab = event.tab();
        let lock = self.locks.as_ref().map(|locks| locks.lock_for(tab));
        let _guard = match &lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        let result = match event {
            BrowserEvent::ActionClicked(tab) => self.controller.on_toggle(tab).await,
            BrowserEvent::TabUpdated {
                tab,
                status: LoadStatus::Loading,
            } => self.controller.on_navigation_start(tab).await,
            BrowserEvent::TabUpdated { .. } => return None,
            BrowserEvent::TabRemoved(tab) => {
                let result = self.controller.on_tab_closed(tab).await;
                if let Some(locks) = &self.locks {
                    locks.forget(tab);
                }
                result
            }
        };
        Some(result)
    }

    /// Spawn the handler for one event without waiting for it
    pub fn dispatch(&self, event: BrowserEvent) {
        let dispatcher = self.clone();
        self.tasks.spawn(async move {
            match dispatcher.handle(event).await {
                Some(Ok(outcome)) => {
                    tracing::debug!(tab = %event.tab(), ?event, ?outcome, "Handled browser event");
                }
                Some(Err(e)) => {
                    tracing::warn!(tab = %e.tab(), kind = e.kind(), error = %e, "Override operation failed");
                }
                None => {}
            }
        });
    }

    /// Consume events until the feed closes or `cancel` fires, then wait for
    /// in-flight handlers.
    pub async fn run(&self, mut events: mpsc::Receiver<BrowserEvent>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => self.dispatch(event),
                    None => break,
                },
            }
        }
        self.wait_idle().await;
    }

    /// Wait until every dispatched handler finished
    pub async fn wait_idle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }
}
