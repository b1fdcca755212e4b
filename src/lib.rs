pub mod app;
pub mod cdp;
pub mod config;
pub mod console;
pub mod controller;
pub mod data;
pub mod emulation;
pub mod error;
pub mod events;
pub mod icon;
pub mod mock;
pub mod probe;
pub mod scheme;
pub mod store;
pub mod util;

pub use app::App;
pub use config::Config;
pub use controller::{OverrideController, TransitionOutcome};
pub use emulation::{EmulatedMedia, EmulationSession};
pub use error::{ApplyFailed, AttachFailed, OverrideError, ProbeUnavailable, StoreError};
pub use events::{BrowserEvent, EventDispatcher, LoadStatus};
pub use icon::{IconPair, IconPresenter, IconSet};
pub use probe::SystemSchemeProbe;
pub use scheme::{OverrideState, Scheme, TabId};
pub use store::{KvOverrideStore, OverrideMap, OverrideStore};
