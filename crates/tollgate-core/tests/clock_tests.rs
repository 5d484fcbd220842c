use chrono::{Duration, TimeZone, Utc};
use tollgate_core::{Clock, ManualClock, SystemClock};

#[test]
fn test_manual_clock_moves_only_when_told() {
    let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let clock = ManualClock::new(start);

    assert_eq!(clock.now(), start);
    assert_eq!(clock.now(), start);

    clock.advance(Duration::minutes(15));
    assert_eq!(clock.now(), start + Duration::minutes(15));

    clock.set(start);
    assert_eq!(clock.now(), start);
}

#[test]
fn test_system_clock_tracks_wall_time() {
    let before = Utc::now();
    let now = SystemClock.now();
    assert!(now >= before);
}
