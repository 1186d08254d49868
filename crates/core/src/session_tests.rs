use super::*;
use crate::clock::{Clock, FakeClock};
use crate::context::EvalContext;
use serde_json::json;
use uuid::Uuid;

#[test]
fn new_session_is_live_and_fresh() {
    let clock = FakeClock::new();
    let session = Session::new(&SessionData::new("s1"), clock.now());
    let state = session.lock();

    assert_eq!(session.id(), "s1");
    assert!(!state.is_disposed());
    assert_eq!(state.idle(clock.now()), Duration::ZERO);
}

#[test]
fn touch_resets_idle_time() {
    let clock = FakeClock::new();
    let session = Session::new(&SessionData::new("s1"), clock.now());

    clock.advance(Duration::from_secs(30));
    session.lock().touch(clock.now());
    clock.advance(Duration::from_secs(5));

    assert_eq!(
        session.lock().idle(clock.now()),
        Duration::from_secs(5)
    );
}

#[test]
fn max_age_comes_from_session_data_and_can_be_retuned() {
    let clock = FakeClock::new();
    let data = SessionData::new("s1")
        .with_description("worker 1")
        .with_max_age(Duration::from_secs(120));
    let session = Session::new(&data, clock.now());

    let mut state = session.lock();
    assert_eq!(state.description(), Some("worker 1"));
    assert_eq!(state.max_age(), Some(Duration::from_secs(120)));

    state.set_max_age(Duration::from_secs(300));
    assert_eq!(state.max_age(), Some(Duration::from_secs(300)));
}

#[test]
fn try_lock_skips_a_busy_session() {
    let clock = FakeClock::new();
    let session = Session::new(&SessionData::new("s1"), clock.now());

    let held = session.lock();
    assert!(session.try_lock().is_none());
    drop(held);
    assert!(session.try_lock().is_some());
}

#[test]
fn dispose_purges_variables_from_mutated_namespaces() {
    let clock = FakeClock::new();
    let namespace = Arc::new(Namespace::new("orders"));
    let table = namespace.get_or_make_table("jobs");

    let mut ctx = EvalContext::new("s1", Uuid::new_v4(), namespace.clone(), clock.now_utc());
    table.set_variable(&mut ctx, "x", json!(1), None, None, false);
    table.commit("s1");

    let mut ctx2 = EvalContext::new("s2", Uuid::new_v4(), namespace.clone(), clock.now_utc());
    table.set_variable(&mut ctx2, "x", json!(2), None, None, true);
    table.commit("s2");

    let session = Session::new(&SessionData::new("s1"), clock.now());
    let mut state = session.lock();
    state.record_mutated_namespace(namespace.clone());

    assert_eq!(state.dispose("s1"), 1);
    assert!(state.is_disposed());
    assert_eq!(state.mutated_namespace_count(), 0);

    // only s2's variable is left behind
    let vars = table.get_variables(&ctx2, "x", false);
    assert_eq!(vars.len(), 1);
    assert_eq!(vars[0].session_id, "s2");
}

#[test]
fn record_mutated_namespace_deduplicates() {
    let clock = FakeClock::new();
    let namespace = Arc::new(Namespace::new("orders"));
    let session = Session::new(&SessionData::new("s1"), clock.now());

    let mut state = session.lock();
    state.record_mutated_namespace(namespace.clone());
    state.record_mutated_namespace(namespace);

    assert_eq!(state.mutated_namespace_count(), 1);
}

#[test]
fn session_data_serde_roundtrip_with_humantime_max_age() {
    let data = SessionData::new("s1").with_max_age(Duration::from_secs(90));
    let json = serde_json::to_value(&data).unwrap();
    assert_eq!(json["max_age"], json!("1m 30s"));

    let back: SessionData = serde_json::from_value(json).unwrap();
    assert_eq!(back, data);
}
