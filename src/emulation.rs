//! Emulation session contract and the media emulation payload.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{ApplyFailed, AttachFailed};
use crate::scheme::{Scheme, TabId};

/// Name of the CSS media feature being emulated
pub const COLOR_SCHEME_FEATURE: &str = "prefers-color-scheme";

/// One emulated media feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaFeature {
    pub name: String,
    pub value: String,
}

/// Parameters of the emulated-media command
///
/// A forced scheme emulates `screen` media with a single
/// `prefers-color-scheme` feature; clearing sends empty media and no
/// features so the page follows the system again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmulatedMedia {
    pub media: String,
    pub features: Vec<MediaFeature>,
}

impl EmulatedMedia {
    pub fn forced(scheme: Scheme) -> Self {
        Self {
            media: "screen".to_string(),
            features: vec![MediaFeature {
                name: COLOR_SCHEME_FEATURE.to_string(),
                value: scheme.as_str().to_string(),
            }],
        }
    }

    pub fn cleared() -> Self {
        Self {
            media: String::new(),
            features: Vec::new(),
        }
    }

    pub fn for_scheme(scheme: Option<Scheme>) -> Self {
        match scheme {
            Some(scheme) => Self::forced(scheme),
            None => Self::cleared(),
        }
    }
}

/// Attach/apply/detach lifecycle of the instrumentation session for a tab
///
/// `apply` is only valid after `ensure_attached` succeeded. Implementations
/// report a call on a detached tab as [`ApplyFailed`].
#[async_trait]
pub trait EmulationSession: Send + Sync {
    /// Whether a live session is currently held for the tab
    async fn is_attached(&self, tab: TabId) -> bool;

    /// Attach if not already attached
    async fn ensure_attached(&self, tab: TabId) -> Result<(), AttachFailed>;

    /// Set (`Some`) or clear (`None`) the emulated color scheme
    async fn apply(&self, tab: TabId, scheme: Option<Scheme>) -> Result<(), ApplyFailed>;

    /// Best-effort detach; errors are swallowed
    async fn detach(&self, tab: TabId);
}
