//! replan-core: pure domain logic for editing a date-indexed schedule.
//!
//! Nothing in this crate performs I/O or reads the wall clock. Callers pass
//! `today` explicitly, which keeps resolution and validation deterministic.
//!
//! # Public API
//!
//! - [`resolve()`] / [`resolve_with()`] -- turn a phrase like "last Tuesday"
//!   into a [`ResolvedTarget`] or an [`Ambiguity`]
//! - [`resolve_week_day()`] -- rolling-week `(week, weekday)` to date
//! - [`validate()`] -- check proposed patches against a [`CanonicalSchedule`]
//! - [`apply_patches()`] -- build the next schedule state from a [`ValidPatchSet`]
//! - [`PatchProposal`] -- the time-boxed draft awaiting confirmation

pub mod apply;
pub mod patch;
pub mod proposal;
pub mod resolve;
pub mod schedule;
pub mod validate;
pub mod week;
pub mod weekday;

// ── Convenience re-exports ───────────────────────────────────────────

pub use apply::{apply_patches, Applied, ApplyError, DayChange, DaySummary};
pub use patch::{
    PatchAction, PatchSetError, ProposedPatch, ResolvedPatch, ValidPatchSet, CANCEL_LABEL,
};
pub use proposal::{PatchProposal, ProposalId};
pub use resolve::{
    resolve, resolve_with, target_for, Ambiguity, AmbiguityPolicy, Phrase, Relativity,
    ResolveError, Resolution, ResolvedTarget,
};
pub use schedule::{CanonicalSchedule, Category, DayRecord, ScheduleError};
pub use validate::{
    validate, RejectionClass, RejectionReport, ValidatorConfig, Violation, ViolationKind,
    DEFAULT_MAX_PATCHES,
};
pub use week::{resolve_week_day, week_number, week_start};
pub use weekday::{parse_weekday, weekday_name};

pub use time::{Date, Weekday};
