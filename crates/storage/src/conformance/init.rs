use std::future::Future;

use super::{make_schedule, TestResult};
use crate::{ScheduleStorage, StorageError};

pub(super) async fn run_init_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "init",
            "initialize_keeps_given_version",
            initialize_keeps_given_version(factory).await,
        ),
        TestResult::from_result(
            "init",
            "initialize_then_read_back",
            initialize_then_read_back(factory).await,
        ),
        TestResult::from_result(
            "init",
            "initialize_duplicate_is_rejected",
            initialize_duplicate_is_rejected(factory).await,
        ),
        TestResult::from_result(
            "init",
            "duplicate_initialize_keeps_original",
            duplicate_initialize_keeps_original(factory).await,
        ),
        TestResult::from_result(
            "init",
            "initialize_rejects_path_like_id",
            initialize_rejects_path_like_id(factory).await,
        ),
        TestResult::from_result(
            "init",
            "list_schedules_is_sorted",
            list_schedules_is_sorted(factory).await,
        ),
    ]
}

async fn initialize_keeps_given_version<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let record = storage
        .initialize_schedule("plan-a", make_schedule(0))
        .await
        .map_err(|e| format!("init: {e}"))?;
    if record.version() != 0 {
        return Err(format!("expected version 0, got {}", record.version()));
    }
    let record = storage
        .initialize_schedule("plan-b", make_schedule(4))
        .await
        .map_err(|e| format!("init: {e}"))?;
    if record.version() != 4 {
        return Err(format!("expected version 4, got {}", record.version()));
    }
    Ok(())
}

async fn initialize_then_read_back<S, F, Fut>(factory: &F) -> Result<(), String>
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
    let record = storage
        .get_schedule("plan-a")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if record.schedule_id != "plan-a" {
        return Err(format!("wrong id: {}", record.schedule_id));
    }
    if record.schedule != make_schedule(0) {
        return Err("stored schedule differs from the one written".to_string());
    }
    Ok(())
}

async fn initialize_duplicate_is_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
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
    match storage.initialize_schedule("plan-a", make_schedule(0)).await {
        Err(StorageError::AlreadyInitialized { schedule_id }) if schedule_id == "plan-a" => Ok(()),
        Err(e) => Err(format!("expected AlreadyInitialized, got {e}")),
        Ok(_) => Err("expected AlreadyInitialized, got Ok".to_string()),
    }
}

async fn duplicate_initialize_keeps_original<S, F, Fut>(factory: &F) -> Result<(), String>
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
    let _ = storage.initialize_schedule("plan-a", make_schedule(9)).await;
    let record = storage
        .get_schedule("plan-a")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if record.version() != 0 {
        return Err(format!(
            "duplicate init overwrote the schedule (version {})",
            record.version()
        ));
    }
    Ok(())
}

async fn initialize_rejects_path_like_id<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    for id in ["", "../escape", "a/b", "plan 1"] {
        match storage.initialize_schedule(id, make_schedule(0)).await {
            Err(StorageError::InvalidId { .. }) => {}
            Err(e) => return Err(format!("id {id:?}: expected InvalidId, got {e}")),
            Ok(_) => return Err(format!("id {id:?}: expected InvalidId, got Ok")),
        }
    }
    Ok(())
}

async fn list_schedules_is_sorted<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let empty = storage
        .list_schedules()
        .await
        .map_err(|e| format!("list: {e}"))?;
    if !empty.is_empty() {
        return Err(format!("fresh storage lists {empty:?}"));
    }
    for id in ["zeta", "alpha", "mid"] {
        storage
            .initialize_schedule(id, make_schedule(0))
            .await
            .map_err(|e| format!("init {id}: {e}"))?;
    }
    let ids = storage
        .list_schedules()
        .await
        .map_err(|e| format!("list: {e}"))?;
    if ids != ["alpha", "mid", "zeta"] {
        return Err(format!("expected [alpha, mid, zeta], got {ids:?}"));
    }
    Ok(())
}
