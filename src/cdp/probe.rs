use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::connection::CdpTransport;
use super::session::{attach_to_target, detach_from_target};
use super::targets::TabRegistry;
use crate::error::ProbeUnavailable;
use crate::probe::{SystemSchemeProbe, PREFERS_DARK_EXPRESSION};
use crate::scheme::{Scheme, TabId};

/// Reads the system scheme by evaluating a media query in the tab's page
///
/// Uses its own short-lived session so it never disturbs the emulation
/// session of the same tab.
pub struct CdpSchemeProbe {
    transport: Arc<dyn CdpTransport>,
    registry: Arc<TabRegistry>,
}

impl CdpSchemeProbe {
    pub fn new(transport: Arc<dyn CdpTransport>, registry: Arc<TabRegistry>) -> Self {
        Self {
            transport,
            registry,
        }
    }

    async fn evaluate(&self, session_id: &str) -> Result<Scheme, ProbeUnavailable> {
        let response = self
            .transport
            .send(
                "Runtime.evaluate",
                json!({ "expression": PREFERS_DARK_EXPRESSION, "returnByValue": true }),
                Some(session_id),
            )
            .await
            .map_err(|e| ProbeUnavailable(e.to_string()))?;
        parse_prefers_dark(&response).map(Scheme::from_prefers_dark)
    }
}

fn parse_prefers_dark(response: &Value) -> Result<bool, ProbeUnavailable> {
    if let Some(details) = response.get("exceptionDetails") {
        return Err(ProbeUnavailable(format!("probe threw: {}", details)));
    }
    response
        .pointer("/result/value")
        .and_then(Value::as_bool)
        .ok_or_else(|| ProbeUnavailable(format!("unexpected probe result: {}", response)))
}

#[async_trait]
impl SystemSchemeProbe for CdpSchemeProbe {
    async fn query(&self, tab: TabId) -> Result<Scheme, ProbeUnavailable> {
        let target_id = self
            .registry
            .target_for(tab)
            .ok_or_else(|| ProbeUnavailable(format!("no target known for tab {}", tab)))?;
        let session_id = attach_to_target(self.transport.as_ref(), &target_id)
            .await
            .map_err(|e| ProbeUnavailable(e.to_string()))?;

        let result = self.evaluate(&session_id).await;

        if let Err(e) = detach_from_target(self.transport.as_ref(), &session_id).await {
            tracing::debug!(tab = %tab, error = %e, "Ignoring probe detach failure");
        }
        result
    }
}
