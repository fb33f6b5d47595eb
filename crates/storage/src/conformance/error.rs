use std::future::Future;

use replan_core::ProposalId;

use super::{make_next, TestResult};
use crate::{ScheduleStorage, StorageError};

pub(super) async fn run_error_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "error",
            "get_schedule_nonexistent",
            get_schedule_nonexistent(factory).await,
        ),
        TestResult::from_result(
            "error",
            "swap_schedule_nonexistent",
            swap_schedule_nonexistent(factory).await,
        ),
        TestResult::from_result(
            "error",
            "get_proposal_unknown",
            get_proposal_unknown(factory).await,
        ),
        TestResult::from_result(
            "error",
            "take_proposal_malformed_id",
            take_proposal_malformed_id(factory).await,
        ),
        TestResult::from_result(
            "error",
            "purge_on_empty_storage",
            purge_on_empty_storage(factory).await,
        ),
    ]
}

async fn get_schedule_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    match storage.get_schedule("missing").await {
        Err(StorageError::ScheduleNotFound { schedule_id }) if schedule_id == "missing" => Ok(()),
        Err(e) => Err(format!("expected ScheduleNotFound, got {e}")),
        Ok(_) => Err("expected ScheduleNotFound, got Ok".to_string()),
    }
}

async fn swap_schedule_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    match storage.swap_schedule("missing", 0, make_next(1, "x")).await {
        Err(StorageError::ScheduleNotFound { .. }) => Ok(()),
        Err(e) => Err(format!("expected ScheduleNotFound, got {e}")),
        Ok(v) => Err(format!("expected ScheduleNotFound, got Ok({v})")),
    }
}

async fn get_proposal_unknown<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let id = ProposalId::generate();
    match storage.get_proposal(&id).await {
        Err(StorageError::ProposalNotFound { proposal_id }) if proposal_id == id.as_str() => Ok(()),
        Err(e) => Err(format!("expected ProposalNotFound, got {e}")),
        Ok(_) => Err("expected ProposalNotFound, got Ok".to_string()),
    }
}

async fn take_proposal_malformed_id<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let id = ProposalId::from("../../schedules/plan-a");
    match storage.take_proposal(&id).await {
        Err(StorageError::ProposalNotFound { .. }) => Ok(()),
        Err(e) => Err(format!("expected ProposalNotFound, got {e}")),
        Ok(_) => Err("expected ProposalNotFound, got Ok".to_string()),
    }
}

async fn purge_on_empty_storage<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let purged = storage
        .purge_expired_proposals(super::fixture_now())
        .await
        .map_err(|e| format!("purge: {e}"))?;
    if purged != 0 {
        return Err(format!("purged {purged} from empty storage"));
    }
    Ok(())
}
