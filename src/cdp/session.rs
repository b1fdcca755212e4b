use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use super::connection::{CdpError, CdpTransport};
use super::targets::TabRegistry;
use crate::emulation::{EmulatedMedia, EmulationSession};
use crate::error::{ApplyFailed, AttachFailed};
use crate::scheme::{Scheme, TabId};

/// Attach a flattened DevTools session to a target and return its id
pub(crate) async fn attach_to_target(
    transport: &dyn CdpTransport,
    target_id: &str,
) -> Result<String, CdpError> {
    let result = transport
        .send(
            "Target.attachToTarget",
            json!({ "targetId": target_id, "flatten": true }),
            None,
        )
        .await?;
    result
        .get("sessionId")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CdpError::UnexpectedResponse(result.to_string()))
}

pub(crate) async fn detach_from_target(
    transport: &dyn CdpTransport,
    session_id: &str,
) -> Result<(), CdpError> {
    transport
        .send(
            "Target.detachFromTarget",
            json!({ "sessionId": session_id }),
            None,
        )
        .await
        .map(|_| ())
}

/// Emulation session backed by one flattened DevTools session per tab
pub struct CdpEmulationSession {
    transport: Arc<dyn CdpTransport>,
    registry: Arc<TabRegistry>,
    sessions: Mutex<HashMap<TabId, String>>,
}

impl CdpEmulationSession {
    pub fn new(transport: Arc<dyn CdpTransport>, registry: Arc<TabRegistry>) -> Self {
        Self {
            transport,
            registry,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Drop bookkeeping for a tab whose target is gone. Sends nothing.
    pub fn forget(&self, tab: TabId) {
        self.sessions.lock().remove(&tab);
    }

    /// Drop bookkeeping for a session the browser reported as detached
    pub fn forget_session(&self, session_id: &str) {
        self.sessions.lock().retain(|_, sid| sid != session_id);
    }

    fn session_id(&self, tab: TabId) -> Option<String> {
        self.sessions.lock().get(&tab).cloned()
    }
}

#[async_trait]
impl EmulationSession for CdpEmulationSession {
    async fn is_attached(&self, tab: TabId) -> bool {
        self.sessions.lock().contains_key(&tab)
    }

    async fn ensure_attached(&self, tab: TabId) -> Result<(), AttachFailed> {
        if self.session_id(tab).is_some() {
            return Ok(());
        }
        let target_id = self
            .registry
            .target_for(tab)
            .ok_or_else(|| AttachFailed(format!("no target known for tab {}", tab)))?;
        let session_id = attach_to_target(self.transport.as_ref(), &target_id)
            .await
            .map_err(|e| AttachFailed(e.to_string()))?;

        tracing::debug!(tab = %tab, session = %session_id, "Attached emulation session");
        let previous = self.sessions.lock().insert(tab, session_id);
        if let Some(previous) = previous {
            // Lost a race with another attach for the same tab
            if let Err(e) = detach_from_target(self.transport.as_ref(), &previous).await {
                tracing::debug!(tab = %tab, session = %previous, error = %e, "Ignoring detach failure");
            }
        }
        Ok(())
    }

    async fn apply(&self, tab: TabId, scheme: Option<Scheme>) -> Result<(), ApplyFailed> {
        let session_id = self
            .session_id(tab)
            .ok_or_else(|| ApplyFailed(format!("no session attached to tab {}", tab)))?;
        let params = serde_json::to_value(EmulatedMedia::for_scheme(scheme))
            .map_err(|e| ApplyFailed(e.to_string()))?;
        self.transport
            .send("Emulation.setEmulatedMedia", params, Some(&session_id))
            .await
            .map(|_| ())
            .map_err(|e| ApplyFailed(e.to_string()))
    }

    async fn detach(&self, tab: TabId) {
        let Some(session_id) = self.sessions.lock().remove(&tab) else {
            return;
        };
        if let Err(e) = detach_from_target(self.transport.as_ref(), &session_id).await {
            tracing::debug!(tab = %tab, error = %e, "Ignoring detach failure");
        }
    }
}
