use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Timelike, Utc};
use tracing::debug;

use crate::clock::Clock;
use crate::ttl_cache::TtlCache;

/// Hours between upstream quota resets. Boundaries fall on 00:00, 08:00 and 16:00 UTC.
pub const RESET_INTERVAL_HOURS: u32 = 8;

/// Next quota reset strictly after `now`.
pub fn next_reset_after(now: DateTime<Utc>) -> DateTime<Utc> {
    let candidate_hour = (now.hour() / RESET_INTERVAL_HOURS + 1) * RESET_INTERVAL_HOURS;
    let midnight = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or(now);
    let mut reset = midnight + Duration::hours(i64::from(candidate_hour));
    if reset <= now {
        reset += Duration::hours(i64::from(RESET_INTERVAL_HOURS));
    }
    reset
}

/// Time left until `reset`, never negative.
pub fn remaining_until(reset: DateTime<Utc>, now: DateTime<Utc>) -> StdDuration {
    (reset - now).to_std().unwrap_or(StdDuration::ZERO)
}

/// `H:MM:SS`, hours unpadded.
pub fn format_countdown(remaining: StdDuration) -> String {
    let secs = remaining.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Memoizes the computed reset instant for a fixed window.
pub struct QuotaResetEstimator<C: Clock> {
    clock: C,
    cache: TtlCache<(), DateTime<Utc>>,
}

impl<C: Clock> QuotaResetEstimator<C> {
    pub fn new(clock: C, ttl: Duration) -> Self {
        Self {
            clock,
            cache: TtlCache::new(ttl),
        }
    }

    pub fn reset_time(&mut self) -> DateTime<Utc> {
        let now = self.clock.now();
        if let Some(cached) = self.cache.get(&(), now) {
            if cached > now {
                return cached;
            }
            debug!(%cached, %now, "cached quota reset is stale, recomputing");
        }
        let reset = next_reset_after(now);
        self.cache.insert((), reset, now);
        reset
    }

    pub fn remaining_time(&mut self) -> StdDuration {
        let reset = self.reset_time();
        remaining_until(reset, self.clock.now())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use chrono::{Duration, TimeZone, Timelike, Utc};

    use super::{QuotaResetEstimator, format_countdown, next_reset_after, remaining_until};
    use crate::clock::ManualClock;

    #[test]
    fn next_reset_rolls_over_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap();
        let reset = next_reset_after(now);
        assert_eq!(reset, Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn next_reset_mid_window() {
        let now = Utc.with_ymd_and_hms(2026, 5, 10, 9, 15, 0).unwrap();
        assert_eq!(
            next_reset_after(now),
            Utc.with_ymd_and_hms(2026, 5, 10, 16, 0, 0).unwrap()
        );
    }

    #[test]
    fn exact_boundary_moves_to_following_window() {
        let now = Utc.with_ymd_and_hms(2026, 5, 10, 8, 0, 0).unwrap();
        let reset = next_reset_after(now);
        assert_eq!(reset, Utc.with_ymd_and_hms(2026, 5, 10, 16, 0, 0).unwrap());
        assert_eq!(reset - now, Duration::hours(8));
    }

    #[test]
    fn every_minute_of_a_day_lands_on_a_boundary() {
        let start = Utc.with_ymd_and_hms(2026, 2, 28, 0, 0, 30).unwrap();
        for minute in 0..(24 * 60) {
            let now = start + Duration::minutes(minute);
            let reset = next_reset_after(now);
            assert!(reset > now);
            assert!(reset - now < Duration::hours(8));
            assert_eq!(reset.minute(), 0);
            assert_eq!(reset.second(), 0);
            assert_eq!(reset.hour() % 8, 0);
        }
    }

    #[test]
    fn remaining_is_clamped_to_zero() {
        let reset = Utc.with_ymd_and_hms(2026, 5, 10, 8, 0, 0).unwrap();
        let now = reset + Duration::seconds(30);
        assert_eq!(remaining_until(reset, now), StdDuration::ZERO);
    }

    #[test]
    fn countdown_format_matches_hours_minutes_seconds() {
        assert_eq!(format_countdown(StdDuration::from_secs(0)), "0:00:00");
        assert_eq!(format_countdown(StdDuration::from_secs(7 * 3600 + 5 * 60 + 9)), "7:05:09");
    }

    #[test]
    fn estimator_reuses_cached_reset_within_window() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 5, 10, 7, 40, 0).unwrap());
        let mut estimator = QuotaResetEstimator::new(&clock, Duration::minutes(10));
        let first = estimator.reset_time();
        clock.advance(Duration::minutes(5));
        assert_eq!(estimator.reset_time(), first);
        assert_eq!(estimator.remaining_time(), StdDuration::from_secs(15 * 60));
    }

    #[test]
    fn estimator_recomputes_when_cached_reset_has_passed() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 5, 10, 7, 55, 0).unwrap());
        let mut estimator = QuotaResetEstimator::new(&clock, Duration::minutes(10));
        assert_eq!(
            estimator.reset_time(),
            Utc.with_ymd_and_hms(2026, 5, 10, 8, 0, 0).unwrap()
        );

        clock.advance(Duration::minutes(7));
        assert_eq!(
            estimator.reset_time(),
            Utc.with_ymd_and_hms(2026, 5, 10, 16, 0, 0).unwrap()
        );
        assert!(estimator.remaining_time() > StdDuration::ZERO);
    }
}
