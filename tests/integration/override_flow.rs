//! Integration tests for the override lifecycle
//!
//! Tests the flow: BrowserEvent -> EventDispatcher -> OverrideController ->
//! store / session / icon state.

use std::sync::Arc;
use std::time::Duration;

use schemeflip::data::MemoryKeyValueStore;
use schemeflip::mock::{FlakyKeyValueStore, MockProbe, SessionCall};
use schemeflip::{
    BrowserEvent, EventDispatcher, LoadStatus, OverrideError, OverrideStore, Scheme, TabId,
    TransitionOutcome,
};

use super::common::Fixture;

const TAB: TabId = TabId(21);

fn loading(tab: TabId) -> BrowserEvent {
    BrowserEvent::TabUpdated {
        tab,
        status: LoadStatus::Loading,
    }
}

/// Light system: click, click, navigate
#[tokio::test]
async fn test_light_system_click_click_navigate() {
    let fx = Fixture::new(Scheme::Light);
    let dispatcher = EventDispatcher::new(fx.controller.clone());

    dispatcher.handle(BrowserEvent::ActionClicked(TAB)).await;
    assert_eq!(fx.store.get(TAB).await.unwrap(), Some(Scheme::Dark));
    assert_eq!(fx.icons.last_for(TAB), Some(Scheme::Light));

    dispatcher.handle(BrowserEvent::ActionClicked(TAB)).await;
    assert_eq!(fx.store.get(TAB).await.unwrap(), None);
    assert_eq!(fx.icons.last_for(TAB), Some(Scheme::Light));

    dispatcher.handle(loading(TAB)).await;
    assert_eq!(fx.icons.last_for(TAB), Some(Scheme::Dark));
    assert_eq!(fx.store.get(TAB).await.unwrap(), None);
}

/// A forced tab keeps its override through a reload that lost the session
#[tokio::test]
async fn test_reload_reattaches_and_reapplies() {
    let fx = Fixture::new(Scheme::Light);
    fx.controller.on_toggle(TAB).await.unwrap();

    fx.session.drop_session(TAB);
    fx.session.clear_calls();

    let outcome = fx.controller.on_navigation_start(TAB).await.unwrap();

    assert_eq!(outcome, TransitionOutcome::Reapplied(Scheme::Dark));
    assert_eq!(
        fx.session.calls(),
        vec![
            SessionCall::Attach(TAB),
            SessionCall::Apply(TAB, Some(Scheme::Dark))
        ]
    );
    assert_eq!(fx.store.get(TAB).await.unwrap(), Some(Scheme::Dark));
}

/// Navigation icon follows the stored override, not a stale system reading
#[tokio::test]
async fn test_navigation_icon_after_system_drift() {
    let fx = Fixture::new(Scheme::Light);
    fx.controller.on_toggle(TAB).await.unwrap();

    fx.probe.set_scheme(Scheme::Dark);
    fx.controller.on_navigation_start(TAB).await.unwrap();

    assert_eq!(fx.icons.last_for(TAB), Some(Scheme::Light));
    assert_eq!(fx.store.get(TAB).await.unwrap(), Some(Scheme::Dark));
}

/// A closed tab's id reused by a new tab starts unforced
#[tokio::test]
async fn test_reused_tab_id_starts_clean() {
    let fx = Fixture::new(Scheme::Dark);
    let dispatcher = EventDispatcher::new(fx.controller.clone());

    dispatcher.handle(BrowserEvent::ActionClicked(TAB)).await;
    assert_eq!(fx.store.get(TAB).await.unwrap(), Some(Scheme::Light));

    dispatcher.handle(BrowserEvent::TabRemoved(TAB)).await;
    dispatcher.handle(loading(TAB)).await;

    assert_eq!(fx.store.get(TAB).await.unwrap(), None);
    assert_eq!(fx.icons.last_for(TAB), Some(Scheme::Light));

    let outcome = fx.controller.on_toggle(TAB).await.unwrap();
    assert_eq!(outcome, TransitionOutcome::Forced(Scheme::Light));
}

/// Closing a tab never talks to the session
#[tokio::test]
async fn test_close_sends_no_detach() {
    let fx = Fixture::new(Scheme::Light);
    fx.controller.on_toggle(TAB).await.unwrap();
    fx.session.clear_calls();

    fx.controller.on_tab_closed(TAB).await.unwrap();
    fx.controller.on_tab_closed(TAB).await.unwrap();

    assert!(fx.session.calls().is_empty());
    assert_eq!(fx.store.get(TAB).await.unwrap(), None);
}

/// A failed store write surfaces as a store error for the tab
#[tokio::test]
async fn test_store_write_failure() {
    let kv = FlakyKeyValueStore::new();
    let fx = Fixture::with_kv(Scheme::Light, Arc::new(kv.clone()));
    kv.fail_writes(true);

    let err = fx.controller.on_toggle(TAB).await.unwrap_err();

    assert!(matches!(err, OverrideError::Store { tab, .. } if tab == TAB));
    assert!(fx.icons.shown().is_empty());
    assert_eq!(kv.inner().raw(schemeflip::store::OVERRIDE_KEY), None);
    assert!(!fx.session.is_attached_now(TAB));
}

/// One tab failing does not affect another
#[tokio::test]
async fn test_failures_are_local_to_one_tab() {
    let fx = Fixture::new(Scheme::Light);
    let dispatcher = EventDispatcher::new(fx.controller.clone());
    let other = TabId(22);

    fx.probe.set_unavailable(true);
    let failed = dispatcher.handle(BrowserEvent::ActionClicked(TAB)).await;
    assert!(matches!(failed, Some(Err(OverrideError::ProbeUnavailable { .. }))));

    fx.probe.set_unavailable(false);
    dispatcher.handle(BrowserEvent::ActionClicked(other)).await;

    assert_eq!(fx.store.get(TAB).await.unwrap(), None);
    assert_eq!(fx.store.get(other).await.unwrap(), Some(Scheme::Dark));
}

/// Without per-tab serialization two overlapping clicks both see Unforced
#[tokio::test]
async fn test_unserialized_double_click_interleaves() {
    let probe = MockProbe::new(Scheme::Light).with_delay(Duration::from_millis(20));
    let fx = Fixture::with_probe(probe, Arc::new(MemoryKeyValueStore::new()));
    let dispatcher = EventDispatcher::new(fx.controller.clone()).with_serialization(false);

    dispatcher.dispatch(BrowserEvent::ActionClicked(TAB));
    dispatcher.dispatch(BrowserEvent::ActionClicked(TAB));
    dispatcher.wait_idle().await;

    assert_eq!(fx.store.get(TAB).await.unwrap(), Some(Scheme::Dark));
    assert_eq!(fx.probe.query_count(), 2);
}

/// Different tabs toggled concurrently all end up forced
#[tokio::test]
async fn test_concurrent_tabs() {
    let probe = MockProbe::new(Scheme::Dark).with_delay(Duration::from_millis(5));
    let fx = Fixture::with_probe(probe, Arc::new(MemoryKeyValueStore::new()));
    let dispatcher = EventDispatcher::new(fx.controller.clone());

    for id in 1..=3 {
        dispatcher.dispatch(BrowserEvent::ActionClicked(TabId(id)));
    }
    dispatcher.wait_idle().await;

    // Whole-map writes race; each handler only ever writes its own key
    let all = fx.store.all().await.unwrap();
    assert!(!all.is_empty());
    assert!(all.values().all(|scheme| *scheme == Scheme::Light));
}
