//! Persistence tests against the SQLite-backed key-value store

use std::sync::Arc;

use schemeflip::cdp::{CdpEmulationSession, TabRegistry, TabWatcher, REGISTRY_KEY};
use schemeflip::data::{AppStateStore, Database, KeyValueStore};
use schemeflip::mock::ScriptedTransport;
use schemeflip::store::OVERRIDE_KEY;
use schemeflip::{EventDispatcher, KvOverrideStore, OverrideStore, Scheme, TabId};
use serde_json::json;
use tokio::sync::mpsc;
use tempfile::TempDir;

use super::common::Fixture;

fn open_kv(dir: &TempDir) -> Arc<dyn KeyValueStore> {
    let db = Database::open(dir.path().join("schemeflip.db")).unwrap();
    Arc::new(AppStateStore::new(db.connection()))
}

#[tokio::test]
async fn test_overrides_survive_reopen() {
    let dir = TempDir::new().unwrap();

    {
        let fx = Fixture::with_kv(Scheme::Light, open_kv(&dir));
        fx.controller.on_toggle(TabId(3)).await.unwrap();
        fx.controller.on_toggle(TabId(9)).await.unwrap();
        fx.controller.on_toggle(TabId(9)).await.unwrap();
    }

    let store = KvOverrideStore::new(open_kv(&dir));
    let all = store.all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all.get(&TabId(3)), Some(&Scheme::Dark));
}

#[tokio::test]
async fn test_reopened_controller_reapplies_on_navigation() {
    let dir = TempDir::new().unwrap();

    {
        let fx = Fixture::with_kv(Scheme::Dark, open_kv(&dir));
        fx.controller.on_toggle(TabId(4)).await.unwrap();
    }

    // Fresh process: nothing attached yet
    let fx = Fixture::with_kv(Scheme::Dark, open_kv(&dir));
    fx.controller.on_navigation_start(TabId(4)).await.unwrap();

    assert!(fx.session.is_attached_now(TabId(4)));
    assert_eq!(fx.icons.last_for(TabId(4)), Some(Scheme::Dark));
}

#[tokio::test]
async fn test_persisted_value_layout() {
    let dir = TempDir::new().unwrap();
    let kv = open_kv(&dir);
    let store = KvOverrideStore::new(kv.clone());

    store.set(TabId(12), Scheme::Light).await.unwrap();
    store.set(TabId(7), Scheme::Dark).await.unwrap();

    let raw = kv.get(OVERRIDE_KEY).await.unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value, serde_json::json!({"7": "dark", "12": "light"}));
}

#[tokio::test]
async fn test_clear_all_removes_key() {
    let dir = TempDir::new().unwrap();
    let kv = open_kv(&dir);
    let store = KvOverrideStore::new(kv.clone());

    store.set(TabId(1), Scheme::Dark).await.unwrap();
    store.clear_all().await.unwrap();

    assert!(store.all().await.unwrap().is_empty());
    assert_eq!(kv.get(OVERRIDE_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn test_tab_registry_survives_reopen() {
    let dir = TempDir::new().unwrap();

    let first = {
        let registry = TabRegistry::load(open_kv(&dir)).await.unwrap();
        let a = registry.tab_for("TARGET-A").await;
        let b = registry.tab_for("TARGET-B").await;
        assert_ne!(a, b);
        a
    };

    let kv = open_kv(&dir);
    assert!(kv.get(REGISTRY_KEY).await.unwrap().is_some());

    let registry = TabRegistry::load(kv).await.unwrap();
    assert_eq!(registry.lookup("TARGET-A"), Some(first));
    let c = registry.tab_for("TARGET-C").await;
    assert!(c.get() > first.get());
}

/// A lost registry record must not let a new tab inherit an old override
#[tokio::test]
async fn test_new_tab_after_unreadable_registry_starts_unforced() {
    let dir = TempDir::new().unwrap();
    let kv = open_kv(&dir);
    kv.set(OVERRIDE_KEY, r#"{"1":"dark"}"#).await.unwrap();
    kv.set(REGISTRY_KEY, "garbage").await.unwrap();

    let fx = Fixture::with_kv(Scheme::Light, kv.clone());
    let dispatcher = EventDispatcher::new(fx.controller.clone());
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond(
        "Target.getTargets",
        json!({ "targetInfos": [
            { "targetId": "BRAND-NEW-TARGET", "type": "page", "url": "https://example.com" }
        ] }),
    );
    let registry = Arc::new(TabRegistry::load(kv).await.unwrap());
    let emulation = Arc::new(CdpEmulationSession::new(transport.clone(), registry.clone()));
    let (tx, mut rx) = mpsc::channel(16);
    let watcher = TabWatcher::new(transport, registry.clone(), emulation, tx);

    let overrides = fx.store.all().await.unwrap();
    watcher.start(&overrides).await.unwrap();
    drop(watcher);
    while let Some(event) = rx.recv().await {
        dispatcher.handle(event).await;
    }

    let fresh = registry.lookup("BRAND-NEW-TARGET").unwrap();
    assert_ne!(fresh, TabId(1));
    assert_eq!(fx.store.get(fresh).await.unwrap(), None);
    assert!(fx.store.all().await.unwrap().is_empty());
}
