//! Chrome DevTools Protocol adapter
//!
//! Concrete probe, emulation session and event feed for a Chromium-family
//! browser started with `--remote-debugging-port`.

mod connection;
mod probe;
mod session;
mod targets;
mod watcher;

pub use connection::{discover_ws_url, CdpConnection, CdpError, CdpEvent, CdpTransport};
pub use probe::CdpSchemeProbe;
pub use session::CdpEmulationSession;
pub use targets::{TabRegistry, REGISTRY_KEY};
pub use watcher::{TabSummary, TabWatcher, TargetInfo};
