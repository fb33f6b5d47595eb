//! Rolling-week arithmetic.
//!
//! A rolling week is the 7-day window starting at
//! `anchor + (week - 1) * 7 days`. Week 1 always begins on the anchor date,
//! whatever weekday that is; these are not Monday-to-Sunday calendar weeks.

use time::{Date, Duration, Weekday};

/// Number of days in a rolling week.
pub const DAYS_PER_WEEK: i64 = 7;

/// First date of rolling week `week` (1-based). `None` for week 0 or when
/// the result falls outside the representable date range.
pub fn week_start(anchor: Date, week: u32) -> Option<Date> {
    if week == 0 {
        return None;
    }
    let offset = i64::from(week - 1).checked_mul(DAYS_PER_WEEK)?;
    anchor.checked_add(Duration::days(offset))
}

/// Resolve a `(week, weekday)` pair against the anchor.
///
/// Scans the seven dates of the rolling window and returns the one whose
/// calendar weekday is `weekday`. Exactly one date matches for any window
/// that exists.
pub fn resolve_week_day(week: u32, weekday: Weekday, anchor: Date) -> Option<Date> {
    let start = week_start(anchor, week)?;
    (0..DAYS_PER_WEEK)
        .filter_map(|offset| start.checked_add(Duration::days(offset)))
        .find(|date| date.weekday() == weekday)
}

/// Rolling week number containing `date`, or `None` if the date precedes
/// the anchor.
pub fn week_number(date: Date, anchor: Date) -> Option<u32> {
    if date < anchor {
        return None;
    }
    let days = (date - anchor).whole_days();
    u32::try_from(days / DAYS_PER_WEEK + 1).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn week_one_starts_on_anchor() {
        let anchor = date!(2026 - 03 - 18);
        assert_eq!(week_start(anchor, 1), Some(anchor));
        assert_eq!(week_start(anchor, 3), Some(date!(2026 - 04 - 01)));
    }

    #[test]
    fn week_zero_has_no_window() {
        assert_eq!(week_start(date!(2026 - 03 - 18), 0), None);
        assert_eq!(
            resolve_week_day(0, Weekday::Monday, date!(2026 - 03 - 18)),
            None
        );
    }

    #[test]
    fn wednesday_anchor_tuesday_is_six_days_later() {
        // 2026-03-18 is a Wednesday, so week 1 runs Wed..Tue.
        let anchor = date!(2026 - 03 - 18);
        assert_eq!(anchor.weekday(), Weekday::Wednesday);
        let tuesday = resolve_week_day(1, Weekday::Tuesday, anchor).unwrap();
        assert_eq!(tuesday, date!(2026 - 03 - 24));
        assert_eq!(tuesday, anchor + Duration::days(6));
    }

    #[test]
    fn anchor_weekday_maps_to_anchor_itself() {
        let anchor = date!(2026 - 03 - 18);
        assert_eq!(
            resolve_week_day(1, Weekday::Wednesday, anchor),
            Some(anchor)
        );
        assert_eq!(
            resolve_week_day(2, Weekday::Wednesday, anchor),
            Some(date!(2026 - 03 - 25))
        );
    }

    #[test]
    fn every_weekday_lands_inside_its_window() {
        let anchor = date!(2025 - 02 - 13); // Thursday
        for week in 1..=4u32 {
            let start = week_start(anchor, week).unwrap();
            let end = start + Duration::days(6);
            for weekday in [
                Weekday::Monday,
                Weekday::Tuesday,
                Weekday::Wednesday,
                Weekday::Thursday,
                Weekday::Friday,
                Weekday::Saturday,
                Weekday::Sunday,
            ] {
                let d = resolve_week_day(week, weekday, anchor).unwrap();
                assert!(d >= start && d <= end, "{d} outside week {week}");
                assert_eq!(d.weekday(), weekday);
                assert_eq!(week_number(d, anchor), Some(week));
            }
        }
    }

    #[test]
    fn week_number_before_anchor_is_none() {
        let anchor = date!(2026 - 03 - 18);
        assert_eq!(week_number(date!(2026 - 03 - 17), anchor), None);
        assert_eq!(week_number(anchor, anchor), Some(1));
        assert_eq!(week_number(date!(2026 - 03 - 24), anchor), Some(1));
        assert_eq!(week_number(date!(2026 - 03 - 25), anchor), Some(2));
    }
}
