//! Property tests: pool bounds and mode consistency hold for any sequence
//! of operations, time jumps and lifecycle signals.

use lives_core::{
    clock::{ManualClock, TimeSource},
    config::PoolConfig,
    engine::{Grant, LivesEngine},
    lifecycle::GameState,
    store::SaveStore,
};
use proptest::prelude::*;

const T: f64 = 1_700_000_000.0;

#[derive(Debug, Clone)]
enum Op {
    Spend(bool),
    Units(u32),
    Unlimited(u32),
    Tick(f64),
    Advance(f64),
    Reconcile,
    State(GameState, GameState),
    Pause(bool),
    Reload,
}

fn game_state() -> impl Strategy<Value = GameState> {
    prop_oneof![
        Just(GameState::Init),
        Just(GameState::Loading),
        Just(GameState::Menu),
        Just(GameState::Level),
        Just(GameState::Win),
        Just(GameState::Fail),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<bool>().prop_map(Op::Spend),
        (0u32..8).prop_map(Op::Units),
        (0u32..3).prop_map(Op::Unlimited),
        (0.0f64..900.0).prop_map(Op::Tick),
        (0.0f64..4_000.0).prop_map(Op::Advance),
        Just(Op::Reconcile),
        (game_state(), game_state()).prop_map(|(a, b)| Op::State(a, b)),
        any::<bool>().prop_map(Op::Pause),
        Just(Op::Reload),
    ]
}

fn build(clock: &ManualClock, store: Box<dyn lives_core::store::SaveBackend>) -> LivesEngine {
    let config = PoolConfig { max_count: 3, refill_period_seconds: 300.0, icon: String::new() };
    LivesEngine::open(config, Box::new(clock.clone()), store).expect("open engine")
}

proptest! {
    #[test]
    fn pool_stays_within_bounds(ops in prop::collection::vec(op(), 1..40)) {
        let clock = ManualClock::new(T);
        let store = SaveStore::in_memory().expect("in-memory store");
        store.migrate().expect("migration");
        let mut engine = build(&clock, Box::new(store));

        for op in ops {
            match op {
                Op::Spend(restore) => { engine.spend(restore); }
                Op::Units(n) => { engine.increase(Grant::Units(n)); }
                Op::Unlimited(m) => { engine.increase(Grant::UnlimitedMinutes(m)); }
                Op::Tick(dt) => engine.tick(dt),
                Op::Advance(dt) => { clock.advance(dt); }
                Op::Reconcile => engine.reconcile(clock.now()).expect("reconcile"),
                Op::State(prev, next) => engine.on_game_state_changed(prev, next),
                Op::Pause(paused) => engine.on_app_pause_changed(paused),
                Op::Reload => {
                    engine.shutdown().expect("shutdown");
                    let backend = engine.into_backend();
                    engine = build(&clock, backend);
                }
            }

            prop_assert!(engine.current() <= engine.max());
            prop_assert_eq!(engine.max(), 3);
            prop_assert_eq!(engine.is_unlimited(), engine.unlimited_remaining() > 0.0);
            prop_assert_eq!(engine.has_lives(), engine.current() > 0 || engine.is_unlimited());
            prop_assert!(!engine.has_pending_save());
        }
    }

    #[test]
    fn repeated_reconcile_is_a_fixed_point(
        ops in prop::collection::vec(op(), 0..20),
        gap in 0.0f64..10_000.0,
    ) {
        let clock = ManualClock::new(T);
        let store = SaveStore::in_memory().expect("in-memory store");
        store.migrate().expect("migration");
        let mut engine = build(&clock, Box::new(store));

        for op in ops {
            match op {
                Op::Spend(restore) => { engine.spend(restore); }
                Op::Unlimited(m) => { engine.increase(Grant::UnlimitedMinutes(m)); }
                Op::Advance(dt) => { clock.advance(dt); }
                _ => {}
            }
        }

        clock.advance(gap);
        engine.reconcile(clock.now()).expect("first reconcile");
        let settled = engine.state().clone();
        let countdown = engine.time_to_next();

        engine.reconcile(clock.now()).expect("second reconcile");
        prop_assert_eq!(engine.state(), &settled);
        prop_assert_eq!(engine.time_to_next(), countdown);
    }
}
