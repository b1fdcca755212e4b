//! Error types for the override state machine and its collaborators.

use thiserror::Error;

use crate::scheme::TabId;

/// The system color scheme could not be read in the tab's page context
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ProbeUnavailable(pub String);

/// The instrumentation session could not be attached
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct AttachFailed(pub String);

/// The command setting or clearing the emulated scheme failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ApplyFailed(pub String);

/// Errors from the durable key-value backing store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Failed to serialize override map: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Storage task failed: {0}")]
    Join(String),
}

/// Failure of one controller operation on one tab.
///
/// Detach failures have no variant: they are swallowed where they happen.
#[derive(Debug, Error)]
pub enum OverrideError {
    #[error("system scheme unavailable for tab {tab}: {source}")]
    ProbeUnavailable {
        tab: TabId,
        #[source]
        source: ProbeUnavailable,
    },
    #[error("failed to attach emulation session to tab {tab}: {source}")]
    AttachFailed {
        tab: TabId,
        #[source]
        source: AttachFailed,
    },
    #[error("failed to apply emulated scheme to tab {tab}: {source}")]
    ApplyFailed {
        tab: TabId,
        #[source]
        source: ApplyFailed,
    },
    #[error("override store failed for tab {tab}: {source}")]
    Store {
        tab: TabId,
        #[source]
        source: StoreError,
    },
}

impl OverrideError {
    pub fn tab(&self) -> TabId {
        match self {
            OverrideError::ProbeUnavailable { tab, .. }
            | OverrideError::AttachFailed { tab, .. }
            | OverrideError::ApplyFailed { tab, .. }
            | OverrideError::Store { tab, .. } => *tab,
        }
    }

    /// Short machine-friendly name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            OverrideError::ProbeUnavailable { .. } => "probe_unavailable",
            OverrideError::AttachFailed { .. } => "attach_failed",
            OverrideError::ApplyFailed { .. } => "apply_failed",
            OverrideError::Store { .. } => "store",
        }
    }
}
