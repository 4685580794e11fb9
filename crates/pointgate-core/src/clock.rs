//! ============================================================================
//! Clock - Injectable time source
//! ============================================================================
//! Every calendar computation (local midnight, day counts, check-in dates)
//! goes through a `Clock` so hosts run on wall-clock time while tests advance
//! simulated days deterministically.
//! ============================================================================

use chrono::{Local, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Milliseconds in one day, the unit of the daily cost engine.
pub const ONE_DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Time source for the ledger. Timestamps are epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;

    /// Local midnight of the day containing `ts_ms`.
    fn midnight_of(&self, ts_ms: i64) -> i64 {
        local_midnight_ms(ts_ms)
    }

    fn today_midnight_ms(&self) -> i64 {
        self.midnight_of(self.now_ms())
    }

    /// Calendar date of `ts_ms` as `YYYY-MM-DD` in local time.
    fn date_string(&self, ts_ms: i64) -> String {
        local_date_string(ts_ms)
    }

    fn today_string(&self) -> String {
        self.date_string(self.now_ms())
    }
}

fn local_midnight_ms(ts_ms: i64) -> i64 {
    // Fall back to UTC day arithmetic if the local timezone cannot map the
    // instant (e.g. a DST gap at midnight).
    let fallback = ts_ms - ts_ms.rem_euclid(ONE_DAY_MS);
    let Some(dt) = Local.timestamp_millis_opt(ts_ms).earliest() else {
        return fallback;
    };
    let Some(day_start) = dt.date_naive().and_hms_opt(0, 0, 0) else {
        return fallback;
    };
    match day_start.and_local_timezone(Local).earliest() {
        Some(midnight) => midnight.timestamp_millis(),
        None => fallback,
    }
}

fn local_date_string(ts_ms: i64) -> String {
    match Local.timestamp_millis_opt(ts_ms).earliest() {
        Some(dt) => dt.format("%Y-%m-%d").to_string(),
        None => String::new(),
    }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Settable clock for tests and simulations.
#[derive(Debug)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(start_ms),
        }
    }

    pub fn set_ms(&self, ts_ms: i64) {
        self.now_ms.store(ts_ms, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }

    pub fn advance_days(&self, days: i64) {
        self.advance_ms(days * ONE_DAY_MS);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midnight_is_idempotent() {
        let clock = ManualClock::new(1_700_000_000_000);
        let mid = clock.today_midnight_ms();
        assert_eq!(clock.midnight_of(mid), mid);
        assert!(mid <= clock.now_ms());
        assert!(clock.now_ms() - mid < ONE_DAY_MS);
    }

    #[test]
    fn test_advancing_a_day_moves_midnight_a_day() {
        let clock = ManualClock::new(1_700_000_000_000);
        let before = clock.today_midnight_ms();
        clock.advance_days(1);
        assert_eq!(clock.today_midnight_ms() - before, ONE_DAY_MS);
    }

    #[test]
    fn test_date_string_format() {
        let clock = ManualClock::new(1_700_000_000_000);
        let date = clock.today_string();
        assert_eq!(date.len(), 10);
        assert_eq!(&date[4..5], "-");
        assert_eq!(&date[7..8], "-");
    }

    #[test]
    fn test_date_string_changes_across_days() {
        let clock = ManualClock::new(1_700_000_000_000);
        let today = clock.today_string();
        clock.advance_days(1);
        assert_ne!(clock.today_string(), today);
    }
}
