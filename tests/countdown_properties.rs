// Property-based tests for the time remaining calculator
// Checks the display contract with random targets and clock readings

use chrono::{Duration, TimeZone, Utc};
use dms_dashboard::services::countdown::{
    format_remaining, time_remaining_ms, CountdownPhase, TimeBreakdown, TIMES_UP_MESSAGE,
};
use proptest::prelude::*;

proptest! {
    /// Property: remaining time never grows as the clock moves forward
    #[test]
    fn prop_remaining_is_non_increasing(
        offset_ms in -1_000_000_000i64..1_000_000_000,
        step_ms in 0i64..100_000_000,
    ) {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let target = now + Duration::milliseconds(offset_ms);

        let earlier = time_remaining_ms(target, now);
        let later = time_remaining_ms(target, now + Duration::milliseconds(step_ms));

        prop_assert!(later <= earlier);
    }

    /// Property: the breakdown adds back up to the whole seconds remaining
    #[test]
    fn prop_breakdown_reassembles(ms in 1u64..400_000_000_000) {
        let parts = TimeBreakdown::from_millis(ms);

        prop_assert!(parts.hours < 24);
        prop_assert!(parts.minutes < 60);
        prop_assert!(parts.seconds < 60);
        let total = ((parts.days * 24 + parts.hours) * 60 + parts.minutes) * 60 + parts.seconds;
        prop_assert_eq!(total, ms / 1000);
    }

    /// Property: only an exact zero reads as expired
    #[test]
    fn prop_display_matches_phase(ms in 0u64..10_000_000) {
        let display = format_remaining(ms);
        match CountdownPhase::from_remaining(ms) {
            CountdownPhase::Expired => prop_assert_eq!(display, TIMES_UP_MESSAGE),
            CountdownPhase::Counting => {
                prop_assert!(display.ends_with('s'));
                prop_assert_ne!(display, TIMES_UP_MESSAGE);
            }
        }
    }
}
