//! Time source used by every operation that stamps or compares dates.
//!
//! Instants are stored in UTC. Calendar dates (order date, "today",
//! invoice year, report ranges) are read in the business timezone,
//! a fixed UTC offset.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Offset, TimeDelta, Utc};

/// Offset of Indian/Antananarivo, which has no daylight saving time.
pub const BUSINESS_UTC_OFFSET_SECS: i32 = 3 * 3600;

/// Default business timezone.
pub fn business_offset() -> FixedOffset {
    FixedOffset::east_opt(BUSINESS_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Offset the business day is counted in.
    fn offset(&self) -> FixedOffset;

    /// Business calendar date of `instant`.
    fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset()).date_naive()
    }

    /// Business calendar date of [`Clock::now`].
    fn today(&self) -> NaiveDate {
        self.local_date(self.now())
    }

    /// Business calendar year of [`Clock::now`].
    fn year(&self) -> i32 {
        self.today().year()
    }

    /// First instant of `date` in the business timezone.
    fn day_start(&self, date: NaiveDate) -> DateTime<Utc> {
        let shift = TimeDelta::seconds(i64::from(self.offset().local_minus_utc()));
        (date.and_time(NaiveTime::MIN) - shift).and_utc()
    }

    /// First instant after `date`; `None` past the last representable day.
    fn day_end(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        date.succ_opt().map(|next| self.day_start(next))
    }
}

/// Wall clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(business_offset())
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}

/// Manually driven clock for tests.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<RwLock<DateTime<Utc>>>,
    offset: FixedOffset,
}

impl FixedClock {
    /// Clock frozen at `now`, in the default business timezone.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::with_offset(now, business_offset())
    }

    pub fn with_offset(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            now: Arc::new(RwLock::new(now)),
            offset,
        }
    }

    /// Moves the clock to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write().unwrap_or_else(|e| e.into_inner()) = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}

/// Shared clock handle passed to services.
pub type SharedClock = Arc<dyn Clock>;

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn fixed_clock_reports_its_instant() {
        let instant = Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap();
        let clock = FixedClock::new(instant);
        assert_eq!(clock.now(), instant);
        assert_eq!(clock.today(), date(2025, 3, 14));
        assert_eq!(clock.year(), 2025);
    }

    #[test]
    fn fixed_clock_can_be_moved() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 12, 31, 19, 0, 0).unwrap());
        let shared = clock.clone();
        assert_eq!(shared.year(), 2025);
        clock.set(Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).unwrap());
        assert_eq!(shared.year(), 2026);
    }

    #[test]
    fn business_day_starts_three_hours_before_utc_midnight() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 5, 31, 22, 30, 0).unwrap());
        assert_eq!(clock.now().date_naive(), date(2025, 5, 31));
        assert_eq!(clock.today(), date(2025, 6, 1));

        clock.set(Utc.with_ymd_and_hms(2025, 5, 31, 20, 59, 59).unwrap());
        assert_eq!(clock.today(), date(2025, 5, 31));
    }

    #[test]
    fn year_turns_at_local_midnight() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 12, 31, 21, 0, 0).unwrap());
        assert_eq!(clock.year(), 2026);
    }

    #[test]
    fn day_bounds_are_local_midnights() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap());
        assert_eq!(
            clock.day_start(date(2025, 6, 1)),
            Utc.with_ymd_and_hms(2025, 5, 31, 21, 0, 0).unwrap()
        );
        assert_eq!(
            clock.day_end(date(2025, 6, 1)),
            Some(Utc.with_ymd_and_hms(2025, 6, 1, 21, 0, 0).unwrap())
        );
    }

    #[test]
    fn utc_clock_keeps_utc_dates() {
        let clock =
            FixedClock::with_offset(Utc.with_ymd_and_hms(2025, 5, 31, 22, 30, 0).unwrap(), Utc.fix());
        assert_eq!(clock.today(), date(2025, 5, 31));
    }
}
