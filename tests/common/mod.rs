//! Shared test utilities for schemeflip
//!
//! Builds controllers wired to mock collaborators over a chosen
//! key-value backend.

use std::sync::Arc;

use schemeflip::data::{KeyValueStore, MemoryKeyValueStore};
use schemeflip::mock::{MockEmulationSession, MockProbe, RecordingIconPresenter};
use schemeflip::{KvOverrideStore, OverrideController, Scheme};

/// Controller plus handles on every collaborator
pub struct Fixture {
    pub controller: Arc<OverrideController>,
    pub store: Arc<KvOverrideStore>,
    pub probe: Arc<MockProbe>,
    pub session: Arc<MockEmulationSession>,
    pub icons: Arc<RecordingIconPresenter>,
}

impl Fixture {
    /// Fixture over an in-memory store with the given system scheme
    pub fn new(system: Scheme) -> Self {
        Self::with_kv(system, Arc::new(MemoryKeyValueStore::new()))
    }

    pub fn with_kv(system: Scheme, kv: Arc<dyn KeyValueStore>) -> Self {
        Self::with_probe(MockProbe::new(system), kv)
    }

    pub fn with_probe(probe: MockProbe, kv: Arc<dyn KeyValueStore>) -> Self {
        let store = Arc::new(KvOverrideStore::new(kv));
        let probe = Arc::new(probe);
        let session = Arc::new(MockEmulationSession::new());
        let icons = Arc::new(RecordingIconPresenter::new());
        let controller = Arc::new(OverrideController::new(
            store.clone(),
            probe.clone(),
            session.clone(),
            icons.clone(),
        ));
        Self {
            controller,
            store,
            probe,
            session,
            icons,
        }
    }
}
