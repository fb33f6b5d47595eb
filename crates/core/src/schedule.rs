//! The canonical schedule: a sorted, date-keyed array of day records plus
//! the optimistic-concurrency version token.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::week::week_number;

/// Kind of activity scheduled on a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Rest,
    Active,
    Event,
}

impl Category {
    /// Parse a category name, ignoring case. "training" and "race" are
    /// accepted as synonyms for `Active` and `Event`.
    pub fn parse(raw: &str) -> Option<Category> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "rest" => Some(Category::Rest),
            "active" | "training" => Some(Category::Active),
            "event" | "race" => Some(Category::Event),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Rest => "REST",
            Category::Active => "ACTIVE",
            Category::Event => "EVENT",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One calendar date's schedule entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRecord {
    pub date: Date,
    pub label: String,
    #[serde(default)]
    pub annotations: Vec<String>,
    pub category: Category,
    /// Completed days are never touched by a patch.
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl DayRecord {
    pub fn new(date: Date, label: impl Into<String>, category: Category) -> Self {
        DayRecord {
            date,
            label: label.into(),
            annotations: Vec::new(),
            category,
            completed: false,
            tag: None,
        }
    }
}

/// Errors raised when constructing a schedule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("duplicate day record for {date}")]
    DuplicateDate { date: Date },
}

/// The single source of truth for a plan.
///
/// Invariants: dates are unique and `days` is sorted ascending. There is no
/// public mutator; the next state of a schedule is produced by
/// [`crate::apply_patches`], which returns a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ScheduleDocument")]
pub struct CanonicalSchedule {
    anchor_date: Date,
    version: u64,
    days: Vec<DayRecord>,
}

/// Unchecked wire shape; converted through [`CanonicalSchedule::from_parts`].
#[derive(Deserialize)]
struct ScheduleDocument {
    anchor_date: Date,
    #[serde(default)]
    version: u64,
    days: Vec<DayRecord>,
}

impl TryFrom<ScheduleDocument> for CanonicalSchedule {
    type Error = ScheduleError;

    fn try_from(doc: ScheduleDocument) -> Result<Self, Self::Error> {
        CanonicalSchedule::from_parts(doc.anchor_date, doc.version, doc.days)
    }
}

impl CanonicalSchedule {
    /// Create a schedule at version 0. Records are sorted by date.
    pub fn new(anchor_date: Date, days: Vec<DayRecord>) -> Result<Self, ScheduleError> {
        Self::from_parts(anchor_date, 0, days)
    }

    /// Create a schedule at an explicit version, e.g. when loading a stored one.
    pub fn from_parts(
        anchor_date: Date,
        version: u64,
        mut days: Vec<DayRecord>,
    ) -> Result<Self, ScheduleError> {
        days.sort_by_key(|d| d.date);
        let mut seen = BTreeSet::new();
        for day in &days {
            if !seen.insert(day.date) {
                return Err(ScheduleError::DuplicateDate { date: day.date });
            }
        }
        Ok(CanonicalSchedule {
            anchor_date,
            version,
            days,
        })
    }

    pub fn anchor_date(&self) -> Date {
        self.anchor_date
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn days(&self) -> &[DayRecord] {
        &self.days
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = Date> + '_ {
        self.days.iter().map(|d| d.date)
    }

    pub fn first_date(&self) -> Option<Date> {
        self.days.first().map(|d| d.date)
    }

    pub fn last_date(&self) -> Option<Date> {
        self.days.last().map(|d| d.date)
    }

    /// Look up the record for `date` (binary search; `days` is sorted).
    pub fn day(&self, date: Date) -> Option<&DayRecord> {
        self.days
            .binary_search_by_key(&date, |d| d.date)
            .ok()
            .map(|i| &self.days[i])
    }

    pub fn contains(&self, date: Date) -> bool {
        self.day(date).is_some()
    }

    /// Rolling week number of `date` relative to this schedule's anchor.
    pub fn week_of(&self, date: Date) -> Option<u32> {
        week_number(date, self.anchor_date)
    }

    /// The next state of this schedule: same anchor, `version + 1`, the
    /// given records re-sorted by date. Callers pass records derived one to
    /// one from `self.days`, so dates stay unique.
    pub(crate) fn successor(&self, mut days: Vec<DayRecord>) -> CanonicalSchedule {
        days.sort_by_key(|d| d.date);
        CanonicalSchedule {
            anchor_date: self.anchor_date,
            version: self.version + 1,
            days,
        }
    }

    /// Consume the schedule, returning its records.
    pub fn into_days(self) -> Vec<DayRecord> {
        self.days
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn day(date: Date, label: &str) -> DayRecord {
        DayRecord::new(date, label, Category::Active)
    }

    #[test]
    fn new_sorts_records_and_starts_at_version_zero() {
        let schedule = CanonicalSchedule::new(
            date!(2026 - 03 - 18),
            vec![
                day(date!(2026 - 03 - 20), "Tempo"),
                day(date!(2026 - 03 - 18), "Easy"),
                day(date!(2026 - 03 - 19), "Intervals"),
            ],
        )
        .unwrap();

        assert_eq!(schedule.version(), 0);
        let dates: Vec<Date> = schedule.dates().collect();
        assert_eq!(
            dates,
            vec![
                date!(2026 - 03 - 18),
                date!(2026 - 03 - 19),
                date!(2026 - 03 - 20)
            ]
        );
        assert_eq!(schedule.first_date(), Some(date!(2026 - 03 - 18)));
        assert_eq!(schedule.last_date(), Some(date!(2026 - 03 - 20)));
    }

    #[test]
    fn duplicate_dates_are_refused() {
        let err = CanonicalSchedule::new(
            date!(2026 - 03 - 18),
            vec![
                day(date!(2026 - 03 - 18), "Easy"),
                day(date!(2026 - 03 - 18), "Long"),
            ],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ScheduleError::DuplicateDate {
                date: date!(2026 - 03 - 18)
            }
        );
    }

    #[test]
    fn lookup_by_date() {
        let schedule = CanonicalSchedule::new(
            date!(2026 - 03 - 18),
            vec![day(date!(2026 - 03 - 18), "Easy"), day(date!(2026 - 03 - 21), "Long")],
        )
        .unwrap();
        assert_eq!(schedule.day(date!(2026 - 03 - 21)).unwrap().label, "Long");
        assert!(!schedule.contains(date!(2026 - 03 - 19)));
        assert_eq!(schedule.week_of(date!(2026 - 03 - 25)), Some(2));
    }

    #[test]
    fn deserializes_with_defaults_and_validation() {
        let json = serde_json::json!({
            "anchor_date": "2026-03-18",
            "days": [
                {"date": "2026-03-19", "label": "Intervals", "category": "ACTIVE"},
                {"date": "2026-03-18", "label": "Rest", "category": "REST", "completed": true}
            ]
        });
        let schedule: CanonicalSchedule = serde_json::from_value(json).unwrap();
        assert_eq!(schedule.version(), 0);
        assert_eq!(schedule.days()[0].date, date!(2026 - 03 - 18));
        assert!(schedule.days()[0].completed);
        assert!(schedule.days()[1].annotations.is_empty());
        assert_eq!(schedule.days()[1].tag, None);

        let dup = serde_json::json!({
            "anchor_date": "2026-03-18",
            "days": [
                {"date": "2026-03-18", "label": "A", "category": "REST"},
                {"date": "2026-03-18", "label": "B", "category": "REST"}
            ]
        });
        assert!(serde_json::from_value::<CanonicalSchedule>(dup).is_err());
    }

    #[test]
    fn serializes_dates_as_iso_strings() {
        let schedule =
            CanonicalSchedule::new(date!(2026 - 03 - 18), vec![day(date!(2026 - 03 - 18), "Easy")])
                .unwrap();
        let value = serde_json::to_value(&schedule).unwrap();
        assert_eq!(value["anchor_date"], "2026-03-18");
        assert_eq!(value["days"][0]["date"], "2026-03-18");
        assert_eq!(value["days"][0]["category"], "ACTIVE");
        assert!(value["days"][0].get("tag").is_none());
    }

    #[test]
    fn category_parse_accepts_synonyms() {
        assert_eq!(Category::parse("Training"), Some(Category::Active));
        assert_eq!(Category::parse("RACE"), Some(Category::Event));
        assert_eq!(Category::parse("rest"), Some(Category::Rest));
        assert_eq!(Category::parse("nap"), None);
    }
}
