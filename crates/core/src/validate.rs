//! Patch Validator.
//!
//! Checks a proposed patch set against the canonical schedule and either
//! returns a fully resolved [`ValidPatchSet`] or a [`RejectionReport`]
//! listing every violation found. Validation is all-or-nothing: a single
//! bad patch rejects the whole set.
//!
//! Checks, per patch and in order:
//! 1. Structure (target present and well formed, known action, REPLACE has a label)
//! 2. Safety cap on the number of patches (checked once for the set)
//! 3. Target date exists in the schedule
//! 4. Target day is not completed
//! 5. `(week, weekday)` pairs resolve to a date inside the schedule

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::Date;

use crate::patch::{PatchAction, ProposedPatch, ResolvedPatch, ValidPatchSet};
use crate::schedule::{CanonicalSchedule, Category};
use crate::week::resolve_week_day;
use crate::weekday::parse_weekday;

/// Default cap on the number of patches in one mutation.
pub const DEFAULT_MAX_PATCHES: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Largest patch set accepted in one mutation.
    pub max_patches: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        ValidatorConfig {
            max_patches: DEFAULT_MAX_PATCHES,
        }
    }
}

/// The five rejection classes reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RejectionClass {
    StructuralRejection,
    SafetyCapExceeded,
    DateNotInSchedule,
    ImmutableTargetRejection,
    IncompleteWeekdayResolution,
}

impl fmt::Display for RejectionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectionClass::StructuralRejection => "structural",
            RejectionClass::SafetyCapExceeded => "safety cap exceeded",
            RejectionClass::DateNotInSchedule => "date not in schedule",
            RejectionClass::ImmutableTargetRejection => "immutable target",
            RejectionClass::IncompleteWeekdayResolution => "incomplete weekday resolution",
        };
        f.write_str(s)
    }
}

/// A specific reason a patch (or the whole set) was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    EmptyPatchSet,
    MissingTarget,
    /// Only one half of a `(week, weekday)` pair was supplied.
    IncompleteWeekPair,
    MalformedDate { raw: String },
    UnknownAction { raw: String },
    MissingLabel,
    UnknownCategory { raw: String },
    UnknownWeekday { raw: String },
    DuplicateTarget { date: Date },
    TooManyPatches { count: usize, max: usize },
    DateNotInSchedule { date: Date },
    AssertedDateMismatch { asserted: Date, resolved: Date },
    CompletedTarget { date: Date },
    WeekOutOfRange { week: u32 },
    WeekdayOutsideSchedule { week: u32, weekday: String, date: Date },
}

impl ViolationKind {
    pub fn class(&self) -> RejectionClass {
        match self {
            ViolationKind::EmptyPatchSet
            | ViolationKind::MissingTarget
            | ViolationKind::IncompleteWeekPair
            | ViolationKind::MalformedDate { .. }
            | ViolationKind::UnknownAction { .. }
            | ViolationKind::MissingLabel
            | ViolationKind::UnknownCategory { .. }
            | ViolationKind::UnknownWeekday { .. }
            | ViolationKind::DuplicateTarget { .. } => RejectionClass::StructuralRejection,
            ViolationKind::TooManyPatches { .. } => RejectionClass::SafetyCapExceeded,
            ViolationKind::DateNotInSchedule { .. } | ViolationKind::AssertedDateMismatch { .. } => {
                RejectionClass::DateNotInSchedule
            }
            ViolationKind::CompletedTarget { .. } => RejectionClass::ImmutableTargetRejection,
            ViolationKind::WeekOutOfRange { .. } | ViolationKind::WeekdayOutsideSchedule { .. } => {
                RejectionClass::IncompleteWeekdayResolution
            }
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::EmptyPatchSet => write!(f, "no patches proposed"),
            ViolationKind::MissingTarget => {
                write!(f, "patch has neither a date nor a (week, weekday) pair")
            }
            ViolationKind::IncompleteWeekPair => {
                write!(f, "week and weekday must be given together")
            }
            ViolationKind::MalformedDate { raw } => write!(f, "malformed date '{}'", raw),
            ViolationKind::UnknownAction { raw } => {
                write!(f, "unknown action '{}' (expected CANCEL or REPLACE)", raw)
            }
            ViolationKind::MissingLabel => write!(f, "REPLACE requires a non-empty label"),
            ViolationKind::UnknownCategory { raw } => write!(f, "unknown category '{}'", raw),
            ViolationKind::UnknownWeekday { raw } => write!(f, "unknown weekday '{}'", raw),
            ViolationKind::DuplicateTarget { date } => {
                write!(f, "more than one patch targets {}", date)
            }
            ViolationKind::TooManyPatches { count, max } => {
                write!(f, "{} patches proposed, at most {} allowed", count, max)
            }
            ViolationKind::DateNotInSchedule { date } => {
                write!(f, "{} is not in the schedule", date)
            }
            ViolationKind::AssertedDateMismatch { asserted, resolved } => write!(
                f,
                "asserted date {} does not match computed date {}",
                asserted, resolved
            ),
            ViolationKind::CompletedTarget { date } => {
                write!(f, "{} is already completed and cannot be changed", date)
            }
            ViolationKind::WeekOutOfRange { week } => {
                write!(f, "week {} has no date window", week)
            }
            ViolationKind::WeekdayOutsideSchedule {
                week,
                weekday,
                date,
            } => write!(
                f,
                "week {} {} resolves to {}, which is outside the schedule",
                week, weekday, date
            ),
        }
    }
}

/// One violation, tied to the offending patch when there is one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Index into the proposed patch list; `None` for set-level violations.
    pub index: Option<usize>,
    pub class: RejectionClass,
    #[serde(flatten)]
    pub kind: ViolationKind,
}

impl Violation {
    fn new(index: Option<usize>, kind: ViolationKind) -> Self {
        Violation {
            index,
            class: kind.class(),
            kind,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "patch #{} [{}]: {}", i, self.class, self.kind),
            None => write!(f, "patch set [{}]: {}", self.class, self.kind),
        }
    }
}

/// Every violation found in a rejected patch set. Nothing from the set is
/// applicable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionReport {
    pub patch_count: usize,
    pub violations: Vec<Violation>,
}

impl RejectionReport {
    /// Distinct rejection classes present, in declaration order.
    pub fn classes(&self) -> Vec<RejectionClass> {
        let mut classes: Vec<RejectionClass> = self.violations.iter().map(|v| v.class).collect();
        classes.sort();
        classes.dedup();
        classes
    }

    pub fn has_class(&self, class: RejectionClass) -> bool {
        self.violations.iter().any(|v| v.class == class)
    }

    /// Indices of patches with at least one violation.
    pub fn failing_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.violations.iter().filter_map(|v| v.index).collect();
        indices.dedup();
        indices
    }
}

impl fmt::Display for RejectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "patch set rejected ({} of {} patches failed, {} violations)",
            self.failing_indices().len(),
            self.patch_count,
            self.violations.len()
        )?;
        for v in &self.violations {
            write!(f, "\n  - {}", v)?;
        }
        Ok(())
    }
}

impl std::error::Error for RejectionReport {}

/// Validate `patches` against `schedule`.
pub fn validate(
    patches: &[ProposedPatch],
    schedule: &CanonicalSchedule,
    config: &ValidatorConfig,
) -> Result<ValidPatchSet, RejectionReport> {
    let mut violations = Vec::new();

    if patches.is_empty() {
        violations.push(Violation::new(None, ViolationKind::EmptyPatchSet));
    }
    if patches.len() > config.max_patches {
        violations.push(Violation::new(
            None,
            ViolationKind::TooManyPatches {
                count: patches.len(),
                max: config.max_patches,
            },
        ));
    }

    let mut resolved = Vec::with_capacity(patches.len());
    let mut claimed: BTreeMap<Date, usize> = BTreeMap::new();

    for (index, patch) in patches.iter().enumerate() {
        let mut found = Vec::new();
        let outcome = check_patch(patch, schedule, &mut found);

        if let Some((date, _)) = &outcome {
            if claimed.insert(*date, index).is_some() {
                found.push(ViolationKind::DuplicateTarget { date: *date });
            }
        }

        if found.is_empty() {
            if let Some((date, action)) = outcome {
                resolved.push(normalize(patch, date, action));
            }
        } else {
            violations.extend(found.into_iter().map(|kind| Violation::new(Some(index), kind)));
        }
    }

    if violations.is_empty() {
        Ok(ValidPatchSet::new(resolved))
    } else {
        Err(RejectionReport {
            patch_count: patches.len(),
            violations,
        })
    }
}

/// Run the per-patch checks. Returns the target date and action when both
/// could be determined; violations are pushed onto `found`.
fn check_patch(
    patch: &ProposedPatch,
    schedule: &CanonicalSchedule,
    found: &mut Vec<ViolationKind>,
) -> Option<(Date, PatchAction)> {
    // 1. Structure
    let action = PatchAction::parse(&patch.action);
    if action.is_none() {
        found.push(ViolationKind::UnknownAction {
            raw: patch.action.clone(),
        });
    }
    if action == Some(PatchAction::Replace)
        && patch.label.as_deref().map_or(true, |l| l.trim().is_empty())
    {
        found.push(ViolationKind::MissingLabel);
    }
    if let Some(raw) = &patch.category {
        if Category::parse(raw).is_none() {
            found.push(ViolationKind::UnknownCategory { raw: raw.clone() });
        }
    }

    let asserted = match &patch.date {
        Some(raw) => match parse_iso_date(raw) {
            Some(d) => Some(d),
            None => {
                found.push(ViolationKind::MalformedDate { raw: raw.clone() });
                None
            }
        },
        None => None,
    };

    let pair = match (patch.week, &patch.weekday) {
        (Some(week), Some(raw)) => match parse_weekday(raw) {
            Some(weekday) => Some((week, weekday, raw.as_str())),
            None => {
                found.push(ViolationKind::UnknownWeekday { raw: raw.clone() });
                None
            }
        },
        (None, None) => None,
        _ => {
            found.push(ViolationKind::IncompleteWeekPair);
            None
        }
    };

    if patch.date.is_none() && patch.week.is_none() && patch.weekday.is_none() {
        found.push(ViolationKind::MissingTarget);
    }

    // 5. Weekday resolution runs before existence so that a pair-derived
    // date can be checked against the schedule like any other.
    let mut pair_failed = false;
    let computed = pair.and_then(|(week, weekday, raw)| {
        match resolve_week_day(week, weekday, schedule.anchor_date()) {
            None => {
                found.push(ViolationKind::WeekOutOfRange { week });
                pair_failed = true;
                None
            }
            Some(date) if !schedule.contains(date) => {
                found.push(ViolationKind::WeekdayOutsideSchedule {
                    week,
                    weekday: raw.to_string(),
                    date,
                });
                pair_failed = true;
                None
            }
            Some(date) => Some(date),
        }
    });

    // 3. Existence (including agreement with the computed date)
    let target = match (asserted, computed) {
        (Some(asserted), Some(resolved)) if asserted != resolved => {
            found.push(ViolationKind::AssertedDateMismatch { asserted, resolved });
            None
        }
        (_, Some(resolved)) => Some(resolved),
        (Some(_), None) if pair_failed => None,
        (Some(asserted), None) => {
            if schedule.contains(asserted) {
                Some(asserted)
            } else {
                found.push(ViolationKind::DateNotInSchedule { date: asserted });
                None
            }
        }
        (None, None) => None,
    };

    // 4. Immutability
    if let Some(date) = target {
        if schedule.day(date).is_some_and(|d| d.completed) {
            found.push(ViolationKind::CompletedTarget { date });
        }
    }

    target.zip(action)
}

fn normalize(patch: &ProposedPatch, date: Date, action: PatchAction) -> ResolvedPatch {
    match action {
        PatchAction::Cancel => ResolvedPatch::cancel(date),
        PatchAction::Replace => ResolvedPatch {
            date,
            action,
            label: patch
                .label
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
            annotations: patch.annotations.clone(),
            category: patch.category.as_deref().and_then(Category::parse),
            tag: patch.tag.clone(),
        },
    }
}

fn parse_iso_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]")).ok()
}
