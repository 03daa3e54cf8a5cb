use detector_core::decision::{
    CLEAR_THRESHOLD, Detector, IndicatorOutput, MAX_BLOCKED_COUNT, MAX_CLEAR_COUNT,
};

/// Sustained clear detection holds GREEN for the full idle window, then
/// shuts both outputs off and marks the device inactive.
#[test]
fn sustained_clear_deactivates_after_the_idle_window() {
    let mut detector = Detector::new();

    for tick in 1..=MAX_CLEAR_COUNT {
        assert_eq!(
            detector.on_tick(20),
            IndicatorOutput::Cleared,
            "tick {tick} should still be green"
        );
        assert_eq!(detector.clear_count(), tick);
        assert!(!detector.is_inactive());
    }

    assert_eq!(detector.on_tick(20), IndicatorOutput::Dark);
    assert!(detector.is_inactive());
    assert_eq!(detector.clear_count(), MAX_CLEAR_COUNT);

    // Staying cleared keeps the device parked dark indefinitely.
    for _ in 0..100 {
        assert_eq!(detector.on_tick(20), IndicatorOutput::Dark);
        assert!(detector.is_inactive());
    }
}

/// From the inactive state, a blocked blip shorter than the reactivation
/// streak leaves the indicator dark; the streak's final tick re-lights RED.
#[test]
fn brief_blocked_blips_are_ignored_while_inactive() {
    let mut detector = deactivated_detector();

    for tick in 1..MAX_BLOCKED_COUNT {
        assert_eq!(
            detector.on_tick(0),
            IndicatorOutput::Dark,
            "tick {tick} should stay dark"
        );
        assert_eq!(detector.blocked_count(), tick);
    }

    assert_eq!(detector.on_tick(0), IndicatorOutput::Blocked);
    assert_eq!(detector.clear_count(), 0);
    assert!(!detector.is_inactive());
}

/// A clear cycle in the middle of a blocked streak forgives the streak.
#[test]
fn clear_cycle_interrupts_the_reactivation_streak() {
    let mut detector = deactivated_detector();

    for _ in 0..MAX_BLOCKED_COUNT - 1 {
        detector.on_tick(0);
    }
    assert_eq!(detector.on_tick(CLEAR_THRESHOLD), IndicatorOutput::Cleared);
    assert_eq!(detector.blocked_count(), 0);

    // The streak has to start over before RED returns.
    detector.on_tick(20);
    let mut idle = deactivated_from(detector);
    for _ in 0..MAX_BLOCKED_COUNT - 1 {
        assert_eq!(idle.on_tick(0), IndicatorOutput::Dark);
    }
    assert_eq!(idle.on_tick(0), IndicatorOutput::Blocked);
}

/// Once active, a blocked cycle re-lights RED immediately regardless of
/// debounce counters.
#[test]
fn active_device_reacts_to_blockage_without_delay() {
    let mut detector = Detector::new();
    detector.on_tick(20);
    assert_eq!(detector.on_tick(0), IndicatorOutput::Blocked);
    assert_eq!(detector.clear_count(), 0);
}

fn deactivated_detector() -> Detector {
    deactivated_from(Detector::new())
}

fn deactivated_from(mut detector: Detector) -> Detector {
    for _ in 0..=MAX_CLEAR_COUNT {
        detector.on_tick(20);
    }
    assert!(detector.is_inactive());
    detector
}
