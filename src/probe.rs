use async_trait::async_trait;

use crate::error::ProbeUnavailable;
use crate::scheme::{Scheme, TabId};

/// Page-side expression reporting whether the system prefers a dark scheme
pub const PREFERS_DARK_EXPRESSION: &str = "matchMedia('(prefers-color-scheme: dark)').matches";

/// Reads the real color-scheme preference in the context of a tab
///
/// Every call is a fresh single attempt; implementations must not cache.
#[async_trait]
pub trait SystemSchemeProbe: Send + Sync {
    async fn query(&self, tab: TabId) -> Result<Scheme, ProbeUnavailable>;
}
