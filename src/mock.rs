//! Mock collaborators for deterministic testing
//!
//! Implement the probe, emulation session, icon presenter and key-value
//! traits without a browser. Every mock captures its interactions for later
//! assertions and can be switched into failure modes.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use schemeflip::controller::OverrideController;
//! use schemeflip::data::MemoryKeyValueStore;
//! use schemeflip::mock::{MockEmulationSession, MockProbe, RecordingIconPresenter};
//! use schemeflip::store::KvOverrideStore;
//! use schemeflip::{Scheme, TabId};
//!
//! #[tokio::test]
//! async fn test_toggle() {
//!     let controller = OverrideController::new(
//!         Arc::new(KvOverrideStore::new(Arc::new(MemoryKeyValueStore::new()))),
//!         Arc::new(MockProbe::new(Scheme::Light)),
//!         Arc::new(MockEmulationSession::new()),
//!         Arc::new(RecordingIconPresenter::new()),
//!     );
//!     controller.on_toggle(TabId(1)).await.unwrap();
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::cdp::{CdpError, CdpTransport};
use crate::data::{KeyValueStore, MemoryKeyValueStore};
use crate::emulation::EmulationSession;
use crate::error::{ApplyFailed, AttachFailed, ProbeUnavailable, StoreError};
use crate::icon::IconPresenter;
use crate::probe::SystemSchemeProbe;
use crate::scheme::{Scheme, TabId};

/// Probe reporting a configurable system scheme
pub struct MockProbe {
    scheme: Mutex<Scheme>,
    unavailable: Mutex<bool>,
    delay: Mutex<Duration>,
    queries: AtomicUsize,
}

impl MockProbe {
    pub fn new(scheme: Scheme) -> Self {
        Self {
            scheme: Mutex::new(scheme),
            unavailable: Mutex::new(false),
            delay: Mutex::new(Duration::ZERO),
            queries: AtomicUsize::new(0),
        }
    }

    /// Change what the system reports from now on
    pub fn set_scheme(&self, scheme: Scheme) {
        *self.scheme.lock() = scheme;
    }

    /// Make every query fail with `ProbeUnavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock() = unavailable;
    }

    /// Suspend each query for `delay` before answering
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock() = delay;
        self
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SystemSchemeProbe for MockProbe {
    async fn query(&self, _tab: TabId) -> Result<Scheme, ProbeUnavailable> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if delay > Duration::ZERO {
            tokio::time::sleep(delay).await;
        }
        if *self.unavailable.lock() {
            return Err(ProbeUnavailable("mock probe unavailable".into()));
        }
        Ok(*self.scheme.lock())
    }
}

/// One recorded emulation session interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCall {
    Attach(TabId),
    Apply(TabId, Option<Scheme>),
    Detach(TabId),
}

#[derive(Default)]
struct SessionFailures {
    attach: bool,
    apply: bool,
    detach: bool,
}

/// Emulation session tracking attach state per tab
#[derive(Default)]
pub struct MockEmulationSession {
    attached: Mutex<HashSet<TabId>>,
    calls: Mutex<Vec<SessionCall>>,
    failures: Mutex<SessionFailures>,
}

impl MockEmulationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_attach(&self, fail: bool) {
        self.failures.lock().attach = fail;
    }

    pub fn fail_apply(&self, fail: bool) {
        self.failures.lock().apply = fail;
    }

    pub fn fail_detach(&self, fail: bool) {
        self.failures.lock().detach = fail;
    }

    /// Captured calls, in order
    pub fn calls(&self) -> Vec<SessionCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn is_attached_now(&self, tab: TabId) -> bool {
        self.attached.lock().contains(&tab)
    }

    /// Forget a session without a detach call, as when the tab disappears
    pub fn drop_session(&self, tab: TabId) {
        self.attached.lock().remove(&tab);
    }
}

#[async_trait]
impl EmulationSession for MockEmulationSession {
    async fn is_attached(&self, tab: TabId) -> bool {
        self.attached.lock().contains(&tab)
    }

    async fn ensure_attached(&self, tab: TabId) -> Result<(), AttachFailed> {
        self.calls.lock().push(SessionCall::Attach(tab));
        if self.failures.lock().attach {
            return Err(AttachFailed("mock attach failure".into()));
        }
        self.attached.lock().insert(tab);
        Ok(())
    }

    async fn apply(&self, tab: TabId, scheme: Option<Scheme>) -> Result<(), ApplyFailed> {
        self.calls.lock().push(SessionCall::Apply(tab, scheme));
        if !self.attached.lock().contains(&tab) {
            return Err(ApplyFailed(format!("no session attached to tab {}", tab)));
        }
        if self.failures.lock().apply {
            return Err(ApplyFailed("mock apply failure".into()));
        }
        Ok(())
    }

    async fn detach(&self, tab: TabId) {
        self.calls.lock().push(SessionCall::Detach(tab));
        if self.failures.lock().detach {
            return;
        }
        self.attached.lock().remove(&tab);
    }
}

/// Icon presenter capturing every `show` call
#[derive(Default)]
pub struct RecordingIconPresenter {
    shown: Mutex<Vec<(TabId, Scheme)>>,
}

impl RecordingIconPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> Vec<(TabId, Scheme)> {
        self.shown.lock().clone()
    }

    /// Icon currently displayed for a tab
    pub fn last_for(&self, tab: TabId) -> Option<Scheme> {
        self.shown
            .lock()
            .iter()
            .rev()
            .find(|(t, _)| *t == tab)
            .map(|(_, scheme)| *scheme)
    }
}

#[async_trait]
impl IconPresenter for RecordingIconPresenter {
    async fn show(&self, tab: TabId, scheme: Scheme) {
        self.shown.lock().push((tab, scheme));
    }
}

/// Key-value store whose writes can be made to fail
#[derive(Clone, Default)]
pub struct FlakyKeyValueStore {
    inner: MemoryKeyValueStore,
    fail_writes: Arc<Mutex<bool>>,
}

impl FlakyKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }

    pub fn inner(&self) -> &MemoryKeyValueStore {
        &self.inner
    }
}

#[async_trait]
impl KeyValueStore for FlakyKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if *self.fail_writes.lock() {
            return Err(StoreError::Backend("mock write failure".into()));
        }
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        if *self.fail_writes.lock() {
            return Err(StoreError::Backend("mock write failure".into()));
        }
        self.inner.delete(key).await
    }
}

/// One command captured by [`ScriptedTransport`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCommand {
    pub method: String,
    pub params: Value,
    pub session_id: Option<String>,
}

/// DevTools transport answering from a script instead of a browser
///
/// Unscripted `Target.attachToTarget` calls return sequential session ids
/// (`S1`, `S2`, ...); any other unscripted command returns `{}`.
#[derive(Default)]
pub struct ScriptedTransport {
    calls: Mutex<Vec<RecordedCommand>>,
    responses: Mutex<HashMap<String, Result<Value, CdpError>>>,
    sessions: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait `delay` before answering each command
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answer every `method` call with `result`
    pub fn respond(&self, method: &str, result: Value) {
        self.responses
            .lock()
            .insert(method.to_string(), Ok(result));
    }

    /// Answer every `method` call with a protocol error
    pub fn fail(&self, method: &str, message: &str) {
        self.responses.lock().insert(
            method.to_string(),
            Err(CdpError::Protocol {
                code: -32000,
                message: message.to_string(),
            }),
        );
    }

    pub fn calls(&self) -> Vec<RecordedCommand> {
        self.calls.lock().clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.method.clone()).collect()
    }
}

#[async_trait]
impl CdpTransport for ScriptedTransport {
    async fn send(
        &self,
        method: &str,
        params: Value,
        session_id: Option<&str>,
    ) -> Result<Value, CdpError> {
        self.calls.lock().push(RecordedCommand {
            method: method.to_string(),
            params,
            session_id: session_id.map(str::to_string),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(response) = self.responses.lock().get(method).cloned() {
            return response;
        }
        if method == "Target.attachToTarget" {
            let n = self.sessions.fetch_add(1, Ordering::SeqCst) + 1;
            return Ok(json!({ "sessionId": format!("S{}", n) }));
        }
        Ok(json!({}))
    }
}
