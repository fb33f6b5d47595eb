//! Conformance test suite for `ScheduleStorage` implementations.
//!
//! This module provides a backend-agnostic test suite that any
//! `ScheduleStorage` implementation can run to verify correctness. The suite
//! covers:
//!
//! - **Initialization**: schedule creation, duplicate detection, id rules
//! - **Version validation**: compare-and-swap conflict detection
//! - **Proposals**: insert, read, consume-once, expiry purge
//! - **Concurrency**: racing swaps and racing consumes
//! - **Error handling**: correct error variants for missing data
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory function that
//! creates a fresh, empty storage instance for each test:
//!
//! ```ignore
//! use replan_storage::conformance::run_conformance_suite;
//! use replan_storage::MemoryStorage;
//!
//! #[tokio::test]
//! async fn memory_conformance() {
//!     let report = run_conformance_suite(|| async { MemoryStorage::new() }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod concurrent;
mod error;
mod init;
mod proposal;
mod version;

use std::fmt;
use std::future::Future;

use replan_core::{
    CanonicalSchedule, Category, DayRecord, PatchAction, PatchProposal, ProposalId,
    ResolvedPatch, ValidPatchSet,
};
use time::macros::{date, datetime};
use time::{Date, Duration, OffsetDateTime};

use crate::ScheduleStorage;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "init", "version", "proposal").
    pub category: String,
    /// Test name (e.g. "initialize_keeps_given_version").
    pub name: String,
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn pass(category: &str, name: &str) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: true,
            message: None,
        }
    }

    fn fail(category: &str, name: &str, msg: String) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: false,
            message: Some(msg),
        }
    }

    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self::pass(category, name),
            Err(msg) => Self::fail(category, name, msg),
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a storage backend.
///
/// The `factory` function is called once per test to create a fresh, empty
/// storage instance, ensuring test isolation.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(init::run_init_tests(&factory).await);
    results.extend(error::run_error_tests(&factory).await);
    results.extend(version::run_version_tests(&factory).await);
    results.extend(proposal::run_proposal_tests(&factory).await);
    results.extend(concurrent::run_concurrent_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers: fixtures with sensible defaults ─────────────────────────────────

const ANCHOR: Date = date!(2026 - 03 - 16);

/// A two-week schedule anchored on a Monday, at the given version.
fn make_schedule(version: u64) -> CanonicalSchedule {
    let days = (0..14)
        .map(|i| {
            let date = ANCHOR + Duration::days(i);
            let category = if i % 7 == 6 {
                Category::Rest
            } else {
                Category::Active
            };
            DayRecord::new(date, format!("Day {}", i + 1), category)
        })
        .collect();
    CanonicalSchedule::from_parts(ANCHOR, version, days).expect("fixture dates are distinct")
}

/// Same dates as [`make_schedule`] with the first day relabelled.
fn make_next(version: u64, label: &str) -> CanonicalSchedule {
    let mut days = make_schedule(0).into_days();
    days[0].label = label.to_string();
    CanonicalSchedule::from_parts(ANCHOR, version, days).expect("fixture dates are distinct")
}

fn fixture_now() -> OffsetDateTime {
    datetime!(2026-03-16 08:00 UTC)
}

/// A proposal against `schedule_id` that expires `ttl_minutes` after
/// [`fixture_now`].
fn make_proposal(schedule_id: &str, ttl_minutes: i64) -> PatchProposal {
    let patches = ValidPatchSet::try_from(vec![ResolvedPatch {
        date: ANCHOR,
        action: PatchAction::Replace,
        label: "Easy 30 min".to_string(),
        annotations: None,
        category: None,
        tag: None,
    }])
    .expect("fixture patch is well formed");
    let created_at = fixture_now();
    PatchProposal {
        id: ProposalId::generate(),
        schedule_id: schedule_id.to_string(),
        patches,
        schedule_version_at_creation: 0,
        created_at,
        expires_at: created_at + Duration::minutes(ttl_minutes),
    }
}
