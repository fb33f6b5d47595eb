//! Patch shapes: the untrusted proposal coming in, and the normalized
//! form the validator hands out.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::schedule::Category;

/// Label written by a CANCEL patch.
pub const CANCEL_LABEL: &str = "Rest";

/// What a patch does to its target day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PatchAction {
    Cancel,
    Replace,
}

impl PatchAction {
    pub fn parse(raw: &str) -> Option<PatchAction> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CANCEL" => Some(PatchAction::Cancel),
            "REPLACE" => Some(PatchAction::Replace),
            _ => None,
        }
    }
}

impl fmt::Display for PatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchAction::Cancel => f.write_str("CANCEL"),
            PatchAction::Replace => f.write_str("REPLACE"),
        }
    }
}

/// A proposed change as supplied by the content proposer.
///
/// Every field is loosely typed so that malformed input is reported by the
/// validator instead of failing deserialization. A patch targets a raw
/// `date`, a `(week, weekday)` pair, or both (in which case they must agree).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekday: Option<String>,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl ProposedPatch {
    pub fn cancel(date: &str) -> Self {
        ProposedPatch {
            date: Some(date.to_string()),
            action: "CANCEL".to_string(),
            ..Default::default()
        }
    }

    pub fn replace(date: &str, label: &str) -> Self {
        ProposedPatch {
            date: Some(date.to_string()),
            action: "REPLACE".to_string(),
            label: Some(label.to_string()),
            ..Default::default()
        }
    }

    pub fn cancel_week_day(week: u32, weekday: &str) -> Self {
        ProposedPatch {
            week: Some(week),
            weekday: Some(weekday.to_string()),
            action: "CANCEL".to_string(),
            ..Default::default()
        }
    }

    pub fn replace_week_day(week: u32, weekday: &str, label: &str) -> Self {
        ProposedPatch {
            week: Some(week),
            weekday: Some(weekday.to_string()),
            action: "REPLACE".to_string(),
            label: Some(label.to_string()),
            ..Default::default()
        }
    }
}

/// A validated, date-keyed patch with action defaults applied.
///
/// `None` fields leave the existing value of the day record untouched.
/// CANCEL patches always carry `label = "Rest"`, `category = Rest`, empty
/// annotations and no tag, so a cancelled day keeps its existing tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPatch {
    pub date: Date,
    pub action: PatchAction,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl ResolvedPatch {
    pub(crate) fn cancel(date: Date) -> Self {
        ResolvedPatch {
            date,
            action: PatchAction::Cancel,
            label: CANCEL_LABEL.to_string(),
            annotations: Some(Vec::new()),
            category: Some(Category::Rest),
            tag: None,
        }
    }
}

/// Errors raised when a patch list cannot form a [`ValidPatchSet`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchSetError {
    #[error("patch set is empty")]
    Empty,
    #[error("more than one patch targets {date}")]
    DuplicateDate { date: Date },
    #[error("REPLACE patch for {date} has an empty label")]
    EmptyLabel { date: Date },
    #[error("CANCEL patch for {date} does not match the cancel shape")]
    MalformedCancel { date: Date },
}

/// Non-empty, date-sorted set of patches that passed validation.
///
/// The validator is the normal constructor. Lists coming from elsewhere
/// (stored proposals, fixtures) go through `TryFrom`, which re-checks the
/// shape the validator guarantees: at least one patch, one patch per date,
/// non-empty REPLACE labels and CANCEL patches in their fixed form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ResolvedPatch>", into = "Vec<ResolvedPatch>")]
pub struct ValidPatchSet {
    patches: Vec<ResolvedPatch>,
}

impl TryFrom<Vec<ResolvedPatch>> for ValidPatchSet {
    type Error = PatchSetError;

    fn try_from(patches: Vec<ResolvedPatch>) -> Result<Self, Self::Error> {
        if patches.is_empty() {
            return Err(PatchSetError::Empty);
        }
        for patch in &patches {
            match patch.action {
                PatchAction::Replace if patch.label.trim().is_empty() => {
                    return Err(PatchSetError::EmptyLabel { date: patch.date });
                }
                PatchAction::Cancel
                    if patch.label != CANCEL_LABEL
                        || patch.category != Some(Category::Rest)
                        || patch.tag.is_some()
                        || patch.annotations.as_ref().is_some_and(|a| !a.is_empty()) =>
                {
                    return Err(PatchSetError::MalformedCancel { date: patch.date });
                }
                _ => {}
            }
        }
        let set = ValidPatchSet::new(patches);
        if let Some(pair) = set.patches.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(PatchSetError::DuplicateDate { date: pair[0].date });
        }
        Ok(set)
    }
}

impl From<ValidPatchSet> for Vec<ResolvedPatch> {
    fn from(set: ValidPatchSet) -> Self {
        set.patches
    }
}

impl ValidPatchSet {
    pub(crate) fn new(mut patches: Vec<ResolvedPatch>) -> Self {
        patches.sort_by_key(|p| p.date);
        ValidPatchSet { patches }
    }

    pub fn patches(&self) -> &[ResolvedPatch] {
        &self.patches
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = Date> + '_ {
        self.patches.iter().map(|p| p.date)
    }
}
