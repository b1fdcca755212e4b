//! Property tests over arbitrary click and navigation sequences

use proptest::prelude::*;
use schemeflip::{OverrideState, OverrideStore, Scheme, TabId, TransitionOutcome};

use super::common::Fixture;

#[derive(Debug, Clone, Copy)]
enum Step {
    Click,
    Navigate,
    Close,
}

fn scheme() -> impl Strategy<Value = Scheme> {
    prop_oneof![Just(Scheme::Light), Just(Scheme::Dark)]
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => Just(Step::Click),
        2 => Just(Step::Navigate),
        1 => Just(Step::Close),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn flip_is_an_involution(s in scheme()) {
        prop_assert_ne!(s.flip(), s);
        prop_assert_eq!(s.flip().flip(), s);
    }

    #[test]
    fn two_clicks_restore_unforced(system in scheme(), tab in 1u32..10_000) {
        runtime().block_on(async {
            let fx = Fixture::new(system);
            let tab = TabId(tab);

            let first = fx.controller.on_toggle(tab).await.unwrap();
            assert_eq!(first, TransitionOutcome::Forced(system.flip()));
            fx.controller.on_toggle(tab).await.unwrap();

            assert_eq!(fx.store.get(tab).await.unwrap(), None);
            assert!(!fx.session.is_attached_now(tab));
        });
    }

    /// Clicks preview the system scheme; navigation previews the flip of the current state
    #[test]
    fn store_and_icon_follow_steps(
        system in scheme(),
        steps in proptest::collection::vec(step(), 1..24),
    ) {
        runtime().block_on(async {
            let fx = Fixture::new(system);
            let tab = TabId(5);
            let mut expected = OverrideState::Unforced;

            for step in steps {
                let icon = match step {
                    Step::Click => {
                        fx.controller.on_toggle(tab).await.unwrap();
                        expected = match expected {
                            OverrideState::Unforced => OverrideState::Forced(system.flip()),
                            OverrideState::Forced(_) => OverrideState::Unforced,
                        };
                        Some(system)
                    }
                    Step::Navigate => {
                        fx.controller.on_navigation_start(tab).await.unwrap();
                        Some(match expected {
                            OverrideState::Forced(forced) => forced.flip(),
                            OverrideState::Unforced => system.flip(),
                        })
                    }
                    Step::Close => {
                        fx.controller.on_tab_closed(tab).await.unwrap();
                        expected = OverrideState::Unforced;
                        None
                    }
                };

                let stored = OverrideState::from(fx.store.get(tab).await.unwrap());
                assert_eq!(stored, expected);
                if let Some(icon) = icon {
                    assert_eq!(fx.icons.last_for(tab), Some(icon));
                }
            }
        });
    }
}
