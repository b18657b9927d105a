//! Pure time-remaining arithmetic behind every countdown cell.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MILLIS_PER_DAY: u64 = 86_400_000;
pub const MILLIS_PER_HOUR: u64 = 3_600_000;
pub const MILLIS_PER_MINUTE: u64 = 60_000;
pub const MILLIS_PER_SECOND: u64 = 1_000;

/// Shown instead of a zero breakdown once a policy is due.
pub const TIMES_UP_MESSAGE: &str = "Time's up!";

/// Milliseconds from `now` until `target`, clamped at zero.
pub fn time_remaining_ms(target: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let delta = target.signed_duration_since(now).num_milliseconds();
    u64::try_from(delta).unwrap_or(0)
}

/// Like [`time_remaining_ms`], but an unknown target counts as already due.
pub fn remaining_until(target: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u64 {
    target.map_or(0, |target| time_remaining_ms(target, now))
}

/// Counting while anything remains, Expired at exactly zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CountdownPhase {
    /// Some time left; the timer keeps ticking
    Counting,
    /// Target reached or unreadable; terminal for a fixed target
    Expired,
}

impl CountdownPhase {
    pub fn from_remaining(remaining_ms: u64) -> Self {
        if remaining_ms == 0 {
            CountdownPhase::Expired
        } else {
            CountdownPhase::Counting
        }
    }
}

/// Remaining time split into display units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeBreakdown {
    /// Whole days, unbounded
    pub days: u64,
    /// 0..24
    pub hours: u64,
    /// 0..60
    pub minutes: u64,
    /// 0..60
    pub seconds: u64,
}

impl TimeBreakdown {
    /// Total days first, then the remainder split into hours, minutes and
    /// seconds. Truncates; never rounds.
    pub fn from_millis(ms: u64) -> Self {
        Self {
            days: ms / MILLIS_PER_DAY,
            hours: (ms % MILLIS_PER_DAY) / MILLIS_PER_HOUR,
            minutes: (ms % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE,
            seconds: (ms % MILLIS_PER_MINUTE) / MILLIS_PER_SECOND,
        }
    }
}

impl std::fmt::Display for TimeBreakdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}d {}h {}m {}s",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

/// Display string for a countdown cell: the breakdown, or the terminal
/// message at zero.
pub fn format_remaining(remaining_ms: u64) -> String {
    match CountdownPhase::from_remaining(remaining_ms) {
        CountdownPhase::Expired => TIMES_UP_MESSAGE.to_string(),
        CountdownPhase::Counting => TimeBreakdown::from_millis(remaining_ms).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap()
    }

    #[test]
    fn past_target_is_exactly_zero() {
        let now = base();
        assert_eq!(time_remaining_ms(now - Duration::days(3), now), 0);
        assert_eq!(time_remaining_ms(now, now), 0);
    }

    #[test]
    fn unknown_target_counts_as_due() {
        assert_eq!(remaining_until(None, base()), 0);
        assert_eq!(
            remaining_until(Some(base() + Duration::seconds(5)), base()),
            5_000
        );
    }

    #[test]
    fn one_of_each_unit() {
        let now = base();
        let target = now + Duration::milliseconds(90_061_000);
        let remaining = time_remaining_ms(target, now);
        assert_eq!(
            TimeBreakdown::from_millis(remaining),
            TimeBreakdown {
                days: 1,
                hours: 1,
                minutes: 1,
                seconds: 1
            }
        );
        assert_eq!(format_remaining(remaining), "1d 1h 1m 1s");
    }

    #[test]
    fn zero_is_terminal_but_one_millisecond_is_not() {
        assert_eq!(format_remaining(0), TIMES_UP_MESSAGE);
        assert_eq!(format_remaining(1), "0d 0h 0m 0s");
        assert_eq!(CountdownPhase::from_remaining(1), CountdownPhase::Counting);
    }

    #[test]
    fn breakdown_truncates() {
        assert_eq!(format_remaining(59_999), "0d 0h 0m 59s");
        assert_eq!(format_remaining(MILLIS_PER_DAY - 1), "0d 23h 59m 59s");
        assert_eq!(format_remaining(400 * MILLIS_PER_DAY), "400d 0h 0m 0s");
    }

    proptest! {
        #[test]
        fn prop_past_targets_never_negative(offset_ms in 0i64..10_000_000_000) {
            let now = base();
            let target = now - Duration::milliseconds(offset_ms);
            prop_assert_eq!(time_remaining_ms(target, now), 0);
        }

        #[test]
        fn prop_remaining_is_monotonic(
            ahead_ms in 1i64..1_000_000_000,
            step_a in 0i64..1_000_000_000,
            step_b in 0i64..1_000_000_000,
        ) {
            let now = base();
            let target = now + Duration::milliseconds(ahead_ms);
            let earlier = now + Duration::milliseconds(step_a.min(step_b));
            let later = now + Duration::milliseconds(step_a.max(step_b));

            let at_earlier = time_remaining_ms(target, earlier);
            let at_later = time_remaining_ms(target, later);
            prop_assert!(at_later <= at_earlier);
            prop_assert!(at_earlier <= ahead_ms as u64);
        }

        #[test]
        fn prop_breakdown_recomposes(ms in 0u64..100_000_000_000) {
            let b = TimeBreakdown::from_millis(ms);
            prop_assert!(b.hours < 24 && b.minutes < 60 && b.seconds < 60);
            let recomposed = b.days * MILLIS_PER_DAY
                + b.hours * MILLIS_PER_HOUR
                + b.minutes * MILLIS_PER_MINUTE
                + b.seconds * MILLIS_PER_SECOND;
            prop_assert_eq!(recomposed, ms - ms % MILLIS_PER_SECOND);
        }
    }
}
