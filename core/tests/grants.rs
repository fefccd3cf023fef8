//! Unit grant tests.
//!
//! Tests cover: full-pool rejection, capacity clamp, countdown reset,
//! single publish and flush per change, zero-unit grants.

use lives_core::{
    clock::ManualClock,
    config::PoolConfig,
    engine::{Grant, LivesEngine},
    event::PoolSnapshot,
    state::SaveRecord,
    store::{SaveBackend, SaveStore},
    types::LIVES_SAVE_KEY,
};
use serde_json::json;
use std::sync::mpsc;

const T: f64 = 1_700_000_000.0;

fn store_with(count: u32) -> SaveStore {
    let store = SaveStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    let mut record = SaveRecord::new();
    record.insert("count".into(), json!(count));
    record.insert("max_count".into(), json!(5));
    record.insert("rest_time".into(), json!(T));
    store.save(LIVES_SAVE_KEY, &record).expect("seed record");
    store
}

/// Loaded and reconciled at T, with the reconcile snapshot drained.
fn build(clock: &ManualClock, store: SaveStore) -> (LivesEngine, mpsc::Receiver<PoolSnapshot>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut engine = LivesEngine::new(
        PoolConfig::default_test(),
        Box::new(clock.clone()),
        Box::new(store),
    )
    .expect("build engine");
    let (tx, rx) = mpsc::channel();
    engine.subscribe(Box::new(tx));
    engine.load().expect("load");
    engine.reconcile(T).expect("reconcile");
    let _ = rx.try_iter().count();
    (engine, rx)
}

fn stored_count(engine: LivesEngine) -> serde_json::Value {
    let record = engine
        .into_backend()
        .load(LIVES_SAVE_KEY)
        .expect("load record")
        .expect("saved record");
    record["count"].clone()
}

#[test]
fn grant_on_full_pool_changes_nothing() {
    let clock = ManualClock::new(T);
    let (mut engine, rx) = build(&clock, store_with(5));

    assert!(!engine.increase(Grant::Units(1)));

    assert_eq!(engine.current(), 5);
    assert_eq!(engine.time_to_next(), 600.0);
    assert_eq!(rx.try_iter().count(), 0);
}

#[test]
fn grant_is_clamped_to_capacity_and_restarts_countdown() {
    let clock = ManualClock::new(T);
    let (mut engine, rx) = build(&clock, store_with(5));
    engine.spend(true);
    engine.spend(true);
    engine.tick(100.0);
    assert_eq!(engine.time_to_next(), 500.0);
    let _ = rx.try_iter().count();

    assert!(engine.increase(Grant::Units(7)));

    assert_eq!(engine.current(), 5);
    assert_eq!(engine.time_to_next(), 600.0);
    assert_eq!(
        rx.try_iter().collect::<Vec<_>>(),
        vec![PoolSnapshot { current: 5, max: 5, is_unlimited: false }]
    );
    assert_eq!(stored_count(engine), json!(5));
}

#[test]
fn partial_grant_keeps_restore_checkpoint() {
    let clock = ManualClock::new(T);
    let (mut engine, rx) = build(&clock, store_with(2));
    engine.tick(250.0);

    assert!(engine.increase(Grant::Units(1)));

    assert_eq!(engine.current(), 3);
    assert_eq!(engine.time_to_next(), 600.0);
    assert_eq!(engine.state().last_restore, T);
    assert_eq!(rx.try_iter().count(), 1);
    assert_eq!(stored_count(engine), json!(3));
}

#[test]
fn zero_unit_grant_is_not_a_change() {
    let clock = ManualClock::new(T);
    let (mut engine, rx) = build(&clock, store_with(2));
    engine.tick(100.0);

    assert!(!engine.increase(Grant::Units(0)));

    assert_eq!(engine.current(), 2);
    assert_eq!(engine.time_to_next(), 500.0);
    assert_eq!(rx.try_iter().count(), 0);
}
