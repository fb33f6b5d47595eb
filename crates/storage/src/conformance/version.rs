use std::future::Future;

use super::{make_next, make_schedule, TestResult};
use crate::{ScheduleStorage, StorageError};

pub(super) async fn run_version_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    // Correct version succeeds
    results.push(TestResult::from_result(
        "version",
        "swap_with_current_version_succeeds",
        swap_with_current_version_succeeds(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "swaps_increment_sequentially",
        swaps_increment_sequentially(factory).await,
    ));

    // Wrong version fails
    results.push(TestResult::from_result(
        "version",
        "stale_version_returns_conflict",
        stale_version_returns_conflict(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "future_version_returns_conflict",
        future_version_returns_conflict(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "conflict_leaves_schedule_untouched",
        conflict_leaves_schedule_untouched(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "conflict_has_correct_fields",
        conflict_has_correct_fields(factory).await,
    ));

    // Next version must be expected + 1
    results.push(TestResult::from_result(
        "version",
        "skipping_a_version_is_rejected",
        skipping_a_version_is_rejected(factory).await,
    ));

    results
}

async fn seeded<S, F, Fut>(factory: &F) -> Result<S, String>
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    storage
        .initialize_schedule("plan-a", make_schedule(0))
        .await
        .map_err(|e| format!("init: {e}"))?;
    Ok(storage)
}

async fn swap_with_current_version_succeeds<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = seeded(factory).await?;
    let v = storage
        .swap_schedule("plan-a", 0, make_next(1, "Tempo"))
        .await
        .map_err(|e| format!("swap: {e}"))?;
    if v != 1 {
        return Err(format!("expected new version 1, got {v}"));
    }
    let record = storage
        .get_schedule("plan-a")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if record.version() != 1 || record.schedule.days()[0].label != "Tempo" {
        return Err(format!(
            "read back version {} label {:?}",
            record.version(),
            record.schedule.days()[0].label
        ));
    }
    Ok(())
}

async fn swaps_increment_sequentially<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = seeded(factory).await?;
    for expected in 0..5u64 {
        let v = storage
            .swap_schedule("plan-a", expected, make_next(expected + 1, "Step"))
            .await
            .map_err(|e| format!("swap from {expected}: {e}"))?;
        if v != expected + 1 {
            return Err(format!("swap from {expected} returned {v}"));
        }
    }
    Ok(())
}

async fn stale_version_returns_conflict<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = seeded(factory).await?;
    storage
        .swap_schedule("plan-a", 0, make_next(1, "First"))
        .await
        .map_err(|e| format!("swap: {e}"))?;
    match storage
        .swap_schedule("plan-a", 0, make_next(1, "Second"))
        .await
    {
        Err(StorageError::ConcurrentConflict { .. }) => Ok(()),
        Err(e) => Err(format!("expected ConcurrentConflict, got {e}")),
        Ok(v) => Err(format!("expected ConcurrentConflict, got Ok({v})")),
    }
}

async fn future_version_returns_conflict<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = seeded(factory).await?;
    match storage.swap_schedule("plan-a", 3, make_next(4, "Ahead")).await {
        Err(StorageError::ConcurrentConflict { .. }) => Ok(()),
        Err(e) => Err(format!("expected ConcurrentConflict, got {e}")),
        Ok(v) => Err(format!("expected ConcurrentConflict, got Ok({v})")),
    }
}

async fn conflict_leaves_schedule_untouched<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = seeded(factory).await?;
    storage
        .swap_schedule("plan-a", 0, make_next(1, "Winner"))
        .await
        .map_err(|e| format!("swap: {e}"))?;
    let _ = storage
        .swap_schedule("plan-a", 0, make_next(1, "Loser"))
        .await;
    let record = storage
        .get_schedule("plan-a")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if record.schedule.days()[0].label != "Winner" || record.version() != 1 {
        return Err(format!(
            "losing swap changed the schedule: version {} label {:?}",
            record.version(),
            record.schedule.days()[0].label
        ));
    }
    Ok(())
}

async fn conflict_has_correct_fields<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = seeded(factory).await?;
    storage
        .swap_schedule("plan-a", 0, make_next(1, "First"))
        .await
        .map_err(|e| format!("swap: {e}"))?;
    match storage
        .swap_schedule("plan-a", 0, make_next(1, "Second"))
        .await
    {
        Err(StorageError::ConcurrentConflict {
            schedule_id,
            expected_version,
            actual_version,
        }) => {
            if schedule_id != "plan-a" || expected_version != 0 || actual_version != 1 {
                return Err(format!(
                    "wrong conflict fields: {schedule_id} expected={expected_version} actual={actual_version}"
                ));
            }
            Ok(())
        }
        Err(e) => Err(format!("expected ConcurrentConflict, got {e}")),
        Ok(v) => Err(format!("expected ConcurrentConflict, got Ok({v})")),
    }
}

async fn skipping_a_version_is_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = seeded(factory).await?;
    match storage.swap_schedule("plan-a", 0, make_next(2, "Skip")).await {
        Err(StorageError::InvalidVersion { next_version: 2, .. }) => {}
        Err(e) => return Err(format!("expected InvalidVersion, got {e}")),
        Ok(v) => return Err(format!("expected InvalidVersion, got Ok({v})")),
    }
    let record = storage
        .get_schedule("plan-a")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if record.version() != 0 {
        return Err(format!("rejected swap wrote version {}", record.version()));
    }
    Ok(())
}
