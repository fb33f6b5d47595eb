//! Copy-on-write application of a validated patch set.
//!
//! The input schedule is never modified. A new schedule is built from the
//! old records plus the patches, with the version bumped by exactly one,
//! and handed back to the caller to be swapped in at the storage boundary.

use serde::{Deserialize, Serialize};
use time::Date;

use crate::patch::{ResolvedPatch, ValidPatchSet};
use crate::schedule::{CanonicalSchedule, Category, DayRecord};
use crate::validate::{RejectionReport, Violation, ViolationKind};

/// Label and category of a day, before or after a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySummary {
    pub label: String,
    pub category: Category,
}

impl From<&DayRecord> for DaySummary {
    fn from(day: &DayRecord) -> Self {
        DaySummary {
            label: day.label.clone(),
            category: day.category,
        }
    }
}

/// Audit entry for one changed date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayChange {
    pub date: Date,
    pub before: DaySummary,
    pub after: DaySummary,
}

/// The next schedule state plus what changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub schedule: CanonicalSchedule,
    pub changes: Vec<DayChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    #[error("no day record for {date}")]
    MissingDate { date: Date },
    #[error("{date} is completed and cannot be patched")]
    CompletedDate { date: Date },
    #[error("more than one patch for {date}")]
    DuplicatePatch { date: Date },
}

impl ApplyError {
    /// Report this failure the way the validator reports the same condition.
    pub fn into_report(self, patch_count: usize) -> RejectionReport {
        let kind = match self {
            ApplyError::MissingDate { date } => ViolationKind::DateNotInSchedule { date },
            ApplyError::CompletedDate { date } => ViolationKind::CompletedTarget { date },
            ApplyError::DuplicatePatch { date } => ViolationKind::DuplicateTarget { date },
        };
        RejectionReport {
            patch_count,
            violations: vec![Violation {
                index: None,
                class: kind.class(),
                kind,
            }],
        }
    }
}

/// Build the schedule that results from applying `set` to `schedule`.
///
/// Fields a patch does not set are carried over from the existing record.
/// Existence and immutability are checked again here; on any failure no
/// new schedule is produced.
pub fn apply_patches(
    schedule: &CanonicalSchedule,
    set: &ValidPatchSet,
) -> Result<Applied, ApplyError> {
    for patch in set.patches() {
        match schedule.day(patch.date) {
            None => return Err(ApplyError::MissingDate { date: patch.date }),
            Some(day) if day.completed => {
                return Err(ApplyError::CompletedDate { date: patch.date })
            }
            Some(_) => {}
        }
    }

    let mut changes = Vec::with_capacity(set.len());
    let mut days = Vec::with_capacity(schedule.len());
    let mut pending = set.patches().iter().peekable();

    // Both sequences are sorted by date, so one merge pass suffices.
    for day in schedule.days() {
        match pending.next_if(|p| p.date == day.date) {
            Some(patch) => {
                let next = patched(day, patch);
                changes.push(DayChange {
                    date: day.date,
                    before: DaySummary::from(day),
                    after: DaySummary::from(&next),
                });
                days.push(next);
            }
            None => days.push(day.clone()),
        }
    }

    if let Some(extra) = pending.next() {
        return Err(ApplyError::DuplicatePatch { date: extra.date });
    }

    let schedule = schedule.successor(days);

    Ok(Applied { schedule, changes })
}

fn patched(day: &DayRecord, patch: &ResolvedPatch) -> DayRecord {
    DayRecord {
        date: day.date,
        label: patch.label.clone(),
        annotations: patch
            .annotations
            .clone()
            .unwrap_or_else(|| day.annotations.clone()),
        category: patch.category.unwrap_or(day.category),
        completed: day.completed,
        tag: patch.tag.clone().or_else(|| day.tag.clone()),
    }
}
