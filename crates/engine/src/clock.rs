//! Reference clock.
//!
//! The resolution engine never reads the wall clock; the editor asks a
//! [`Clock`] for `today` and hands it down explicitly.

use std::sync::Mutex;

use time::{Date, Duration, OffsetDateTime, Time, UtcOffset};

/// Source of the current instant and the civil date in a fixed offset.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;

    /// Civil date of [`now`](Self::now) in the clock's own offset.
    fn today(&self) -> Date {
        self.now().date()
    }
}

/// The system clock viewed from a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: UtcOffset,
}

impl SystemClock {
    pub fn utc() -> Self {
        SystemClock {
            offset: UtcOffset::UTC,
        }
    }

    pub fn with_offset(offset: UtcOffset) -> Self {
        SystemClock { offset }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        SystemClock::utc()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.offset)
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<OffsetDateTime>,
}

impl FixedClock {
    pub fn new(now: OffsetDateTime) -> Self {
        FixedClock {
            now: Mutex::new(now),
        }
    }

    /// Midnight UTC at the start of `date`.
    pub fn at_date(date: Date) -> Self {
        Self::new(date.with_time(Time::MIDNIGHT).assume_utc())
    }

    pub fn set(&self, now: OffsetDateTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> OffsetDateTime {
        (**self).now()
    }

    fn today(&self) -> Date {
        (**self).today()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime, offset};

    #[test]
    fn fixed_clock_advances() {
        let clock = FixedClock::new(datetime!(2025-02-12 23:30 UTC));
        assert_eq!(clock.today(), date!(2025 - 02 - 12));
        clock.advance(Duration::hours(1));
        assert_eq!(clock.today(), date!(2025 - 02 - 13));
        clock.set(datetime!(2025-01-01 00:00 UTC));
        assert_eq!(clock.today(), date!(2025 - 01 - 01));
    }

    #[test]
    fn today_follows_the_clock_offset() {
        let clock = FixedClock::new(datetime!(2025-02-12 23:30 UTC).to_offset(offset!(+2)));
        assert_eq!(clock.today(), date!(2025 - 02 - 13));
    }

    #[test]
    fn system_clock_reports_its_offset() {
        let clock = SystemClock::with_offset(offset!(-5));
        assert_eq!(clock.now().offset(), offset!(-5));
    }
}
