//! Date Resolution Engine.
//!
//! Maps a reference phrase ("today", "last Tuesday", "Thursday") plus an
//! explicit `today` to either one calendar date or a structured question.
//! Resolution is a pure function of its arguments: no clock reads, no
//! hidden state, and all arithmetic is on whole civil dates.
//!
//! Phrase classification is a closed enum ([`Phrase`]); a string that fits
//! none of its variants is an [`ResolveError::UnrecognizedPhrase`], which is
//! a hard failure and distinct from an [`Ambiguity`].

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Date, Duration, Weekday};

use crate::week::week_number;
use crate::weekday::{parse_weekday, weekday_name};

/// A recognized reference phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phrase {
    Today,
    Yesterday,
    Tomorrow,
    /// "next <weekday>": soonest strictly-future occurrence.
    Next(Weekday),
    /// "last <weekday>": most recent strictly-past occurrence.
    Last(Weekday),
    /// A weekday with no qualifier; may be ambiguous.
    Bare(Weekday),
    /// An ISO `YYYY-MM-DD` literal, used to re-invoke resolution with a
    /// candidate picked from an [`Ambiguity`].
    Exact(Date),
}

impl Phrase {
    /// Classify a raw phrase. Matching ignores case, surrounding whitespace
    /// and repeated inner whitespace.
    pub fn parse(raw: &str) -> Result<Phrase, ResolveError> {
        let normalized = raw
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_lowercase();

        let unrecognized = || ResolveError::UnrecognizedPhrase {
            phrase: raw.trim().to_string(),
        };

        match normalized.as_str() {
            "today" => return Ok(Phrase::Today),
            "yesterday" => return Ok(Phrase::Yesterday),
            "tomorrow" => return Ok(Phrase::Tomorrow),
            _ => {}
        }

        if let Some(rest) = normalized.strip_prefix("next ") {
            return parse_weekday(rest).map(Phrase::Next).ok_or_else(unrecognized);
        }
        if let Some(rest) = normalized.strip_prefix("last ") {
            return parse_weekday(rest).map(Phrase::Last).ok_or_else(unrecognized);
        }
        if let Some(weekday) = parse_weekday(&normalized) {
            return Ok(Phrase::Bare(weekday));
        }
        if let Ok(date) = Date::parse(&normalized, format_description!("[year]-[month]-[day]")) {
            return Ok(Phrase::Exact(date));
        }
        Err(unrecognized())
    }
}

/// Position of a resolved date relative to the reference day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Relativity {
    Past,
    Today,
    Future,
}

impl Relativity {
    pub fn from_days(days_from_today: i64) -> Relativity {
        match days_from_today {
            0 => Relativity::Today,
            d if d < 0 => Relativity::Past,
            _ => Relativity::Future,
        }
    }
}

/// One unambiguous calendar date produced by resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTarget {
    pub date: Date,
    pub weekday_name: String,
    pub relativity: Relativity,
    pub days_from_today: i64,
    pub display_label: String,
    /// Rolling week number relative to the schedule anchor, when one was
    /// supplied and the date is on or after it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week: Option<u32>,
}

/// A phrase that matches more than one plausible date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ambiguity {
    pub phrase: String,
    pub question: String,
    /// Ordered past first.
    pub candidates: Vec<ResolvedTarget>,
}

impl Ambiguity {
    /// Pick one of the candidates by index.
    pub fn select(&self, index: usize) -> Result<&ResolvedTarget, ResolveError> {
        self.candidates
            .get(index)
            .ok_or(ResolveError::InvalidSelection {
                index,
                count: self.candidates.len(),
            })
    }
}

/// Outcome of resolving one phrase. Ambiguity is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    Resolved(ResolvedTarget),
    Ambiguous(Ambiguity),
}

impl Resolution {
    pub fn resolved(&self) -> Option<&ResolvedTarget> {
        match self {
            Resolution::Resolved(target) => Some(target),
            Resolution::Ambiguous(_) => None,
        }
    }

    pub fn ambiguity(&self) -> Option<&Ambiguity> {
        match self {
            Resolution::Resolved(_) => None,
            Resolution::Ambiguous(ambiguity) => Some(ambiguity),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("unrecognized phrase: '{phrase}'")]
    UnrecognizedPhrase { phrase: String },
    #[error("selection {index} out of range ({count} candidates)")]
    InvalidSelection { index: usize, count: usize },
    #[error("'{phrase}' resolves outside the supported date range")]
    OutOfRange { phrase: String },
}

/// Thresholds deciding when a bare weekday is ambiguous.
///
/// A bare weekday naming today's weekday is always ambiguous. Otherwise it
/// is ambiguous when the past candidate is within `past_within_days` and the
/// future candidate within `future_within_days`; failing that, the closer
/// candidate wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbiguityPolicy {
    pub past_within_days: u32,
    pub future_within_days: u32,
}

impl Default for AmbiguityPolicy {
    fn default() -> Self {
        AmbiguityPolicy {
            past_within_days: 3,
            future_within_days: 7,
        }
    }
}

/// Resolve `phrase` against `today` with the default [`AmbiguityPolicy`].
pub fn resolve(phrase: &str, today: Date, anchor: Option<Date>) -> Result<Resolution, ResolveError> {
    resolve_with(phrase, today, anchor, &AmbiguityPolicy::default())
}

/// Resolve `phrase` against `today` with explicit ambiguity thresholds.
pub fn resolve_with(
    phrase: &str,
    today: Date,
    anchor: Option<Date>,
    policy: &AmbiguityPolicy,
) -> Result<Resolution, ResolveError> {
    let parsed = Phrase::parse(phrase)?;
    let out_of_range = || ResolveError::OutOfRange {
        phrase: phrase.trim().to_string(),
    };
    let at = |offset: i64| {
        today
            .checked_add(Duration::days(offset))
            .map(|date| target_for(date, today, anchor))
            .ok_or_else(out_of_range)
    };

    let resolution = match parsed {
        Phrase::Today => Resolution::Resolved(at(0)?),
        Phrase::Yesterday => Resolution::Resolved(at(-1)?),
        Phrase::Tomorrow => Resolution::Resolved(at(1)?),
        Phrase::Next(weekday) => Resolution::Resolved(at(days_until(today.weekday(), weekday))?),
        Phrase::Last(weekday) => Resolution::Resolved(at(-days_since(today.weekday(), weekday))?),
        Phrase::Exact(date) => Resolution::Resolved(target_for(date, today, anchor)),
        Phrase::Bare(weekday) => {
            let past = at(-days_since(today.weekday(), weekday))?;
            let future = at(days_until(today.weekday(), weekday))?;
            bare_weekday(phrase.trim(), weekday, today, past, future, policy)
        }
    };
    Ok(resolution)
}

/// Build a [`ResolvedTarget`] for an arbitrary date.
pub fn target_for(date: Date, today: Date, anchor: Option<Date>) -> ResolvedTarget {
    let days_from_today = (date - today).whole_days();
    ResolvedTarget {
        date,
        weekday_name: weekday_name(date.weekday()).to_string(),
        relativity: Relativity::from_days(days_from_today),
        days_from_today,
        display_label: display_label(date, days_from_today),
        week: anchor.and_then(|a| week_number(date, a)),
    }
}

fn bare_weekday(
    phrase: &str,
    weekday: Weekday,
    today: Date,
    past: ResolvedTarget,
    future: ResolvedTarget,
    policy: &AmbiguityPolicy,
) -> Resolution {
    let past_distance = past.days_from_today.abs();
    let future_distance = future.days_from_today.abs();

    let ambiguous = today.weekday() == weekday
        || (past_distance <= i64::from(policy.past_within_days)
            && future_distance <= i64::from(policy.future_within_days));

    if ambiguous {
        let question = format!(
            "Which {} do you mean: {} or {}?",
            weekday_name(weekday),
            past.display_label,
            future.display_label
        );
        return Resolution::Ambiguous(Ambiguity {
            phrase: phrase.to_string(),
            question,
            candidates: vec![past, future],
        });
    }

    // Ties go to the future occurrence.
    if past_distance < future_distance {
        Resolution::Resolved(past)
    } else {
        Resolution::Resolved(future)
    }
}

/// Days forward to the next `target` strictly after a day that is `from`.
fn days_until(from: Weekday, target: Weekday) -> i64 {
    let diff = (i64::from(target.number_days_from_monday())
        - i64::from(from.number_days_from_monday()))
    .rem_euclid(7);
    if diff == 0 {
        7
    } else {
        diff
    }
}

/// Days back to the most recent `target` strictly before a day that is `from`.
fn days_since(from: Weekday, target: Weekday) -> i64 {
    let diff = (i64::from(from.number_days_from_monday())
        - i64::from(target.number_days_from_monday()))
    .rem_euclid(7);
    if diff == 0 {
        7
    } else {
        diff
    }
}

fn display_label(date: Date, days_from_today: i64) -> String {
    let month = date.month().to_string();
    let relative = match days_from_today {
        0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        -1 => "yesterday".to_string(),
        d if d > 1 => format!("in {} days", d),
        d => format!("{} days ago", -d),
    };
    format!(
        "{}, {} {} ({})",
        weekday_name(date.weekday()),
        month.get(..3).unwrap_or(&month),
        date.day(),
        relative
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    const ALL_WEEKDAYS: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    fn resolved(phrase: &str, today: Date) -> ResolvedTarget {
        match resolve(phrase, today, None).unwrap() {
            Resolution::Resolved(t) => t,
            Resolution::Ambiguous(a) => panic!("expected resolved, got ambiguity: {}", a.question),
        }
    }

    // ── Phrase classification ────────────────────────────────────────

    #[test]
    fn parse_normalizes_case_and_whitespace() {
        assert_eq!(Phrase::parse("  ToDay ").unwrap(), Phrase::Today);
        assert_eq!(
            Phrase::parse("next   MONDAY").unwrap(),
            Phrase::Next(Weekday::Monday)
        );
        assert_eq!(
            Phrase::parse("Last tue").unwrap(),
            Phrase::Last(Weekday::Tuesday)
        );
        assert_eq!(
            Phrase::parse("thursday").unwrap(),
            Phrase::Bare(Weekday::Thursday)
        );
        assert_eq!(
            Phrase::parse("2025-02-11").unwrap(),
            Phrase::Exact(date!(2025 - 02 - 11))
        );
    }

    #[test]
    fn unrecognized_phrases_fail_hard() {
        for phrase in ["the day after", "next week", "last", "someday", "2025-13-01", ""] {
            match resolve(phrase, date!(2025 - 02 - 12), None) {
                Err(ResolveError::UnrecognizedPhrase { .. }) => {}
                other => panic!("'{phrase}': expected UnrecognizedPhrase, got {other:?}"),
            }
        }
    }

    // ── Fixed-offset phrases ─────────────────────────────────────────

    #[test]
    fn today_yesterday_tomorrow() {
        let today = date!(2025 - 02 - 12);
        let t = resolved("today", today);
        assert_eq!(t.date, today);
        assert_eq!(t.relativity, Relativity::Today);
        assert_eq!(t.days_from_today, 0);

        let y = resolved("yesterday", today);
        assert_eq!(y.date, date!(2025 - 02 - 11));
        assert_eq!(y.relativity, Relativity::Past);
        assert_eq!(y.days_from_today, -1);
        assert_eq!(y.display_label, "Tuesday, Feb 11 (yesterday)");

        let m = resolved("tomorrow", today);
        assert_eq!(m.date, date!(2025 - 02 - 13));
        assert_eq!(m.relativity, Relativity::Future);
        assert_eq!(m.days_from_today, 1);
    }

    #[test]
    fn fixed_phrases_relativity_matches_sign_across_year_boundary() {
        let mut today = date!(2024 - 12 - 20);
        for _ in 0..30 {
            for phrase in ["today", "yesterday", "tomorrow"] {
                let t = resolved(phrase, today);
                assert_eq!(t.relativity, Relativity::from_days(t.days_from_today));
                assert_eq!((t.date - today).whole_days(), t.days_from_today);
            }
            today = today.next_day().unwrap();
        }
    }

    #[test]
    fn leap_day_is_handled_by_calendar_arithmetic() {
        let t = resolved("tomorrow", date!(2024 - 02 - 28));
        assert_eq!(t.date, date!(2024 - 02 - 29));
        let y = resolved("yesterday", date!(2024 - 03 - 01));
        assert_eq!(y.date, date!(2024 - 02 - 29));
    }

    // ── next / last ──────────────────────────────────────────────────

    #[test]
    fn next_monday_from_wednesday() {
        let t = resolved("next Monday", date!(2025 - 02 - 12));
        assert_eq!(t.date, date!(2025 - 02 - 17));
        assert_eq!(t.relativity, Relativity::Future);
        assert_eq!(t.days_from_today, 5);
        assert_eq!(t.weekday_name, "Monday");
    }

    #[test]
    fn next_and_last_same_weekday_skip_a_full_week() {
        let today = date!(2025 - 02 - 12); // Wednesday
        assert_eq!(resolved("next wednesday", today).days_from_today, 7);
        assert_eq!(resolved("last wednesday", today).days_from_today, -7);
    }

    #[test]
    fn next_and_last_stay_within_one_week_for_every_pair() {
        let mut today = date!(2025 - 02 - 10);
        for _ in 0..7 {
            for weekday in ALL_WEEKDAYS {
                let name = weekday_name(weekday);
                let next = resolved(&format!("next {name}"), today);
                let last = resolved(&format!("last {name}"), today);
                assert_eq!(next.date.weekday(), weekday);
                assert_eq!(last.date.weekday(), weekday);
                assert_eq!(next.relativity, Relativity::Future);
                assert_eq!(last.relativity, Relativity::Past);
                if today.weekday() != weekday {
                    assert!((1..=7).contains(&next.days_from_today));
                    assert!((-7..=-1).contains(&last.days_from_today));
                }
            }
            today = today.next_day().unwrap();
        }
    }

    // ── Bare weekdays ────────────────────────────────────────────────

    #[test]
    fn bare_tuesday_on_wednesday_is_ambiguous() {
        let resolution = resolve("Tuesday", date!(2025 - 02 - 12), None).unwrap();
        let ambiguity = resolution.ambiguity().expect("ambiguous");
        assert_eq!(ambiguity.candidates.len(), 2);

        let past = &ambiguity.candidates[0];
        assert_eq!(past.date, date!(2025 - 02 - 11));
        assert_eq!(past.relativity, Relativity::Past);
        assert_eq!(past.days_from_today, -1);

        let future = &ambiguity.candidates[1];
        assert_eq!(future.date, date!(2025 - 02 - 18));
        assert_eq!(future.relativity, Relativity::Future);
        assert_eq!(future.days_from_today, 6);

        assert!(ambiguity.question.contains("Feb 11"));
        assert!(ambiguity.question.contains("Feb 18"));
        assert_eq!(ambiguity.select(1).unwrap().date, date!(2025 - 02 - 18));
        assert!(matches!(
            ambiguity.select(2),
            Err(ResolveError::InvalidSelection { index: 2, count: 2 })
        ));
    }

    #[test]
    fn bare_weekday_equal_to_today_is_always_ambiguous() {
        let resolution = resolve("wednesday", date!(2025 - 02 - 12), None).unwrap();
        let ambiguity = resolution.ambiguity().expect("ambiguous");
        assert_eq!(ambiguity.candidates[0].days_from_today, -7);
        assert_eq!(ambiguity.candidates[1].days_from_today, 7);
    }

    #[test]
    fn bare_weekday_far_in_the_past_resolves_to_future() {
        // Wednesday -> Saturday: past is 4 days back, future is 3 ahead.
        let t = resolved("Saturday", date!(2025 - 02 - 12));
        assert_eq!(t.date, date!(2025 - 02 - 15));
        assert_eq!(t.days_from_today, 3);
    }

    #[test]
    fn past_candidate_exactly_at_threshold_is_ambiguous() {
        // Friday -> Tuesday: 3 days back, 4 ahead.
        let resolution = resolve("Tuesday", date!(2025 - 02 - 14), None).unwrap();
        let ambiguity = resolution.ambiguity().expect("ambiguous at 3 days back");
        assert_eq!(ambiguity.candidates[0].date, date!(2025 - 02 - 11));
        assert_eq!(ambiguity.candidates[0].days_from_today, -3);
        assert_eq!(ambiguity.candidates[1].date, date!(2025 - 02 - 18));
        assert_eq!(ambiguity.candidates[1].days_from_today, 4);
    }

    #[test]
    fn past_candidate_one_past_threshold_resolves_to_future() {
        // Saturday -> Tuesday: 4 days back, 3 ahead.
        let t = resolved("Tuesday", date!(2025 - 02 - 15));
        assert_eq!(t.date, date!(2025 - 02 - 18));
        assert_eq!(t.relativity, Relativity::Future);
        assert_eq!(t.days_from_today, 3);
    }

    #[test]
    fn future_threshold_is_inclusive() {
        let at = AmbiguityPolicy {
            past_within_days: 3,
            future_within_days: 4,
        };
        let below = AmbiguityPolicy {
            past_within_days: 3,
            future_within_days: 3,
        };
        let friday = date!(2025 - 02 - 14);
        assert!(resolve_with("Tuesday", friday, None, &at)
            .unwrap()
            .ambiguity()
            .is_some());
        // 3 back vs 4 ahead: the past candidate is closer.
        let t = resolve_with("Tuesday", friday, None, &below).unwrap();
        assert_eq!(t.resolved().expect("resolved").date, date!(2025 - 02 - 11));
    }

    #[test]
    fn stricter_policy_removes_ambiguity() {
        let policy = AmbiguityPolicy {
            past_within_days: 0,
            future_within_days: 7,
        };
        let resolution = resolve_with("Tuesday", date!(2025 - 02 - 12), None, &policy).unwrap();
        let t = resolution.resolved().expect("resolved");
        // Closer candidate wins: 1 day back vs 6 days ahead.
        assert_eq!(t.date, date!(2025 - 02 - 11));
    }

    #[test]
    fn exact_date_literal_resolves_directly() {
        let t = resolved("2025-02-18", date!(2025 - 02 - 12));
        assert_eq!(t.days_from_today, 6);
        assert_eq!(t.display_label, "Tuesday, Feb 18 (in 6 days)");
    }

    // ── Anchor-relative week ─────────────────────────────────────────

    #[test]
    fn anchor_fills_in_rolling_week() {
        let anchor = Some(date!(2025 - 02 - 05));
        let resolution = resolve("tomorrow", date!(2025 - 02 - 12), anchor).unwrap();
        assert_eq!(resolution.resolved().unwrap().week, Some(2));

        let before = resolve("yesterday", date!(2025 - 02 - 05), anchor).unwrap();
        assert_eq!(before.resolved().unwrap().week, None);
    }

    #[test]
    fn resolving_twice_is_identical() {
        let today = date!(2025 - 02 - 12);
        for phrase in ["today", "Tuesday", "next fri", "last sun", "2025-03-01"] {
            assert_eq!(
                resolve(phrase, today, None).unwrap(),
                resolve(phrase, today, None).unwrap()
            );
        }
    }

    #[test]
    fn resolution_serializes_with_status_tag() {
        let value = serde_json::to_value(resolve("Tuesday", date!(2025 - 02 - 12), None).unwrap())
            .unwrap();
        assert_eq!(value["status"], "ambiguous");
        assert_eq!(value["candidates"][0]["relativity"], "PAST");
        assert_eq!(value["candidates"][0]["date"], "2025-02-11");

        let value =
            serde_json::to_value(resolve("today", date!(2025 - 02 - 12), None).unwrap()).unwrap();
        assert_eq!(value["status"], "resolved");
        assert_eq!(value["relativity"], "TODAY");
    }
}
