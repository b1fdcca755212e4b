//! Data persistence layer
//!
//! SQLite-backed key-value storage plus an in-memory substitute.

mod app_state;
mod database;
mod kv;
mod migrations;

pub use app_state::AppStateStore;
pub use database::{Database, DatabaseError};
pub use kv::{KeyValueStore, MemoryKeyValueStore};
