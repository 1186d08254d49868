use super::*;
use yare::parameterized;

#[test]
fn fresh_tracker_is_fully_trusted() {
    let tracker = TrustTracker::default();
    assert_eq!(tracker.trust_level(), 1.0);
    assert_eq!(tracker.calls_norm(), 0.0);
}

#[test]
fn burst_snaps_the_norm_up_instantly() {
    let mut tracker = TrustTracker::default();
    tracker.tick(100);
    assert_eq!(tracker.calls_norm(), 100.0);
    assert_eq!(tracker.trust_level(), 1.0);
}

#[test]
fn steady_rate_keeps_full_trust() {
    let mut tracker = TrustTracker::default();
    for _ in 0..20 {
        let trust = tracker.tick(50);
        assert_eq!(trust, 1.0);
    }
}

#[test]
fn abrupt_silence_drops_trust_that_tick() {
    let mut tracker = TrustTracker::default();
    tracker.tick(100);

    let trust = tracker.tick(0);
    assert!(trust < 1.0);
}

#[test]
fn trust_recovers_as_the_norm_decays() {
    let mut tracker = TrustTracker::default();
    tracker.tick(100);
    tracker.tick(0);
    assert!(tracker.trust_level() < 1.0);

    // the norm decays below 1 after enough quiet ticks
    for _ in 0..40 {
        tracker.tick(0);
    }
    assert_eq!(tracker.trust_level(), 1.0);
    assert_eq!(tracker.calls_norm(), 0.0);
}

#[test]
fn partial_drop_degrades_trust_proportionally() {
    let mut tracker = TrustTracker::default();
    tracker.tick(100);

    // norm decays to 83, calls at 40: trust = 1 - (83 - 40) / 83
    let trust = tracker.tick(40);
    let expected = 1.0 - (83.0 - 40.0) / 83.0;
    assert!((trust - expected).abs() < 1e-9);
}

#[parameterized(
    quiet_start = { 0, 1.0 },
    single_call = { 1, 1.0 },
    small_burst = { 2, 1.0 },
)]
fn first_tick_is_always_trusted(calls: u64, expected: f64) {
    let mut tracker = TrustTracker::default();
    assert_eq!(tracker.tick(calls), expected);
}

#[test]
fn quiet_state_resets_the_norm() {
    let mut tracker = TrustTracker::default();
    tracker.tick(1);
    assert_eq!(tracker.calls_norm(), 0.0);
    assert_eq!(tracker.trust_level(), 1.0);
}

#[test]
fn jitter_is_bounded() {
    let mut tracker = TrustTracker::default();
    assert_eq!(tracker.jitter(Duration::ZERO), Duration::ZERO);
    for _ in 0..100 {
        assert!(tracker.jitter(Duration::from_millis(350)) <= Duration::from_millis(350));
    }
}

#[test]
fn low_trust_reseeds_without_disturbing_the_outcome() {
    let mut tracker = TrustTracker::default();
    tracker.tick(100);
    let trust = tracker.tick(0);
    assert!(trust < 0.9);

    // jitter still works after the reseed
    assert!(tracker.jitter(Duration::from_millis(100)) <= Duration::from_millis(100));
}
