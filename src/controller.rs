//! Per-tab override state machine.
//!
//! Each entry point is one sequential chain of async steps. A failing step
//! aborts the rest of the chain for that tab, so the store is never updated
//! to claim an emulation change that did not happen.

use std::sync::Arc;

use crate::emulation::EmulationSession;
use crate::error::OverrideError;
use crate::icon::IconPresenter;
use crate::probe::SystemSchemeProbe;
use crate::scheme::{OverrideState, Scheme, TabId};
use crate::store::OverrideStore;

/// What an entry point did to a tab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Emulation applied and persisted; the tab is now forced to this scheme
    Forced(Scheme),
    /// Override removed; the tab follows the system scheme again
    Released { system: Scheme },
    /// Stored override re-applied after navigation
    Reapplied(Scheme),
    /// No override; the icon was refreshed from the system scheme
    Previewed { system: Scheme },
    /// Closed tab's entry was removed from the store
    Cleared,
    /// Closed tab had no entry
    Untouched,
}

pub struct OverrideController {
    store: Arc<dyn OverrideStore>,
    probe: Arc<dyn SystemSchemeProbe>,
    session: Arc<dyn EmulationSession>,
    icons: Arc<dyn IconPresenter>,
}

impl OverrideController {
    pub fn new(
        store: Arc<dyn OverrideStore>,
        probe: Arc<dyn SystemSchemeProbe>,
        session: Arc<dyn EmulationSession>,
        icons: Arc<dyn IconPresenter>,
    ) -> Self {
        Self {
            store,
            probe,
            session,
            icons,
        }
    }

    pub fn store(&self) -> &Arc<dyn OverrideStore> {
        &self.store
    }

    /// User toggled the action for `tab`
    pub async fn on_toggle(&self, tab: TabId) -> Result<TransitionOutcome, OverrideError> {
        match self.read_state(tab).await? {
            OverrideState::Forced(forced) => {
                tracing::debug!(tab = %tab, forced = %forced, "Removing override");
                self.attach(tab).await?;
                self.apply(tab, None).await?;
                self.session.detach(tab).await;
                self.store
                    .clear(tab)
                    .await
                    .map_err(|source| OverrideError::Store { tab, source })?;

                // The icon previews the next click, which forces again
                let system = self.probe(tab).await?;
                self.icons.show(tab, system).await;
                Ok(TransitionOutcome::Released { system })
            }
            OverrideState::Unforced => {
                let system = self.probe(tab).await?;
                let opposite = system.flip();
                tracing::debug!(tab = %tab, system = %system, forced = %opposite, "Adding override");

                // An unforced tab holds no session
                self.attach(tab).await?;
                if let Err(e) = self.apply(tab, Some(opposite)).await {
                    self.session.detach(tab).await;
                    return Err(e);
                }
                if let Err(source) = self.store.set(tab, opposite).await {
                    self.session.detach(tab).await;
                    return Err(OverrideError::Store { tab, source });
                }
                self.icons.show(tab, system).await;
                Ok(TransitionOutcome::Forced(opposite))
            }
        }
    }

    /// `tab` started loading a new document
    ///
    /// Emulation is bound to the page context, so a forced scheme has to be
    /// applied again for every new document.
    pub async fn on_navigation_start(
        &self,
        tab: TabId,
    ) -> Result<TransitionOutcome, OverrideError> {
        match self.read_state(tab).await? {
            OverrideState::Forced(forced) => {
                if !self.session.is_attached(tab).await {
                    self.attach(tab).await?;
                }
                self.apply(tab, Some(forced)).await?;
                self.icons.show(tab, forced.flip()).await;
                tracing::debug!(tab = %tab, forced = %forced, "Restored override after navigation");
                Ok(TransitionOutcome::Reapplied(forced))
            }
            OverrideState::Unforced => {
                let system = self.probe(tab).await?;
                self.icons.show(tab, system.flip()).await;
                Ok(TransitionOutcome::Previewed { system })
            }
        }
    }

    /// `tab` was removed
    ///
    /// The session went away with the tab, so no detach is sent.
    pub async fn on_tab_closed(&self, tab: TabId) -> Result<TransitionOutcome, OverrideError> {
        let cleared = self
            .store
            .clear(tab)
            .await
            .map_err(|source| OverrideError::Store { tab, source })?;
        if cleared {
            tracing::debug!(tab = %tab, "Dropped override of closed tab");
            Ok(TransitionOutcome::Cleared)
        } else {
            Ok(TransitionOutcome::Untouched)
        }
    }

    async fn read_state(&self, tab: TabId) -> Result<OverrideState, OverrideError> {
        self.store
            .get(tab)
            .await
            .map(OverrideState::from)
            .map_err(|source| OverrideError::Store { tab, source })
    }

    async fn probe(&self, tab: TabId) -> Result<Scheme, OverrideError> {
        self.probe
            .query(tab)
            .await
            .map_err(|source| OverrideError::ProbeUnavailable { tab, source })
    }

    async fn attach(&self, tab: TabId) -> Result<(), OverrideError> {
        self.session
            .ensure_attached(tab)
            .await
            .map_err(|source| OverrideError::AttachFailed { tab, source })
    }

    async fn apply(&self, tab: TabId, scheme: Option<Scheme>) -> Result<(), OverrideError> {
        self.session
            .apply(tab, scheme)
            .await
            .map_err(|source| OverrideError::ApplyFailed { tab, source })
    }
}
