use std::future::Future;

use time::Duration;

use super::{fixture_now, make_proposal, TestResult};
use crate::{ScheduleStorage, StorageError};

pub(super) async fn run_proposal_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "proposal",
            "insert_then_get_round_trips",
            insert_then_get_round_trips(factory).await,
        ),
        TestResult::from_result(
            "proposal",
            "get_does_not_consume",
            get_does_not_consume(factory).await,
        ),
        TestResult::from_result(
            "proposal",
            "take_consumes_exactly_once",
            take_consumes_exactly_once(factory).await,
        ),
        TestResult::from_result(
            "proposal",
            "duplicate_insert_is_rejected",
            duplicate_insert_is_rejected(factory).await,
        ),
        TestResult::from_result(
            "proposal",
            "purge_removes_only_expired",
            purge_removes_only_expired(factory).await,
        ),
        TestResult::from_result(
            "proposal",
            "purge_keeps_proposal_at_deadline",
            purge_keeps_proposal_at_deadline(factory).await,
        ),
    ]
}

async fn insert_then_get_round_trips<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let proposal = make_proposal("plan-a", 20);
    storage
        .insert_proposal(proposal.clone())
        .await
        .map_err(|e| format!("insert: {e}"))?;
    let read = storage
        .get_proposal(&proposal.id)
        .await
        .map_err(|e| format!("get: {e}"))?;
    if read != proposal {
        return Err(format!("read back {read:?}, wrote {proposal:?}"));
    }
    Ok(())
}

async fn get_does_not_consume<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let proposal = make_proposal("plan-a", 20);
    storage
        .insert_proposal(proposal.clone())
        .await
        .map_err(|e| format!("insert: {e}"))?;
    for i in 0..3 {
        storage
            .get_proposal(&proposal.id)
            .await
            .map_err(|e| format!("get #{i}: {e}"))?;
    }
    storage
        .take_proposal(&proposal.id)
        .await
        .map_err(|e| format!("take after reads: {e}"))?;
    Ok(())
}

async fn take_consumes_exactly_once<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let proposal = make_proposal("plan-a", 20);
    storage
        .insert_proposal(proposal.clone())
        .await
        .map_err(|e| format!("insert: {e}"))?;
    let taken = storage
        .take_proposal(&proposal.id)
        .await
        .map_err(|e| format!("first take: {e}"))?;
    if taken.id != proposal.id {
        return Err(format!("took {} instead of {}", taken.id, proposal.id));
    }
    match storage.take_proposal(&proposal.id).await {
        Err(StorageError::ProposalNotFound { .. }) => {}
        Err(e) => return Err(format!("second take: expected ProposalNotFound, got {e}")),
        Ok(_) => return Err("second take returned the proposal again".to_string()),
    }
    match storage.get_proposal(&proposal.id).await {
        Err(StorageError::ProposalNotFound { .. }) => Ok(()),
        Err(e) => Err(format!("get after take: expected ProposalNotFound, got {e}")),
        Ok(_) => Err("consumed proposal is still readable".to_string()),
    }
}

async fn duplicate_insert_is_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let proposal = make_proposal("plan-a", 20);
    storage
        .insert_proposal(proposal.clone())
        .await
        .map_err(|e| format!("insert: {e}"))?;
    match storage.insert_proposal(proposal).await {
        Err(StorageError::DuplicateProposal { .. }) => Ok(()),
        Err(e) => Err(format!("expected DuplicateProposal, got {e}")),
        Ok(()) => Err("duplicate insert succeeded".to_string()),
    }
}

async fn purge_removes_only_expired<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let short = make_proposal("plan-a", 5);
    let long = make_proposal("plan-a", 60);
    for p in [short.clone(), long.clone()] {
        storage
            .insert_proposal(p)
            .await
            .map_err(|e| format!("insert: {e}"))?;
    }
    let purged = storage
        .purge_expired_proposals(fixture_now() + Duration::minutes(30))
        .await
        .map_err(|e| format!("purge: {e}"))?;
    if purged != 1 {
        return Err(format!("expected 1 purged, got {purged}"));
    }
    if storage.get_proposal(&short.id).await.is_ok() {
        return Err("expired proposal survived purge".to_string());
    }
    storage
        .get_proposal(&long.id)
        .await
        .map_err(|e| format!("live proposal was purged: {e}"))?;
    Ok(())
}

async fn purge_keeps_proposal_at_deadline<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = factory().await;
    let proposal = make_proposal("plan-a", 20);
    storage
        .insert_proposal(proposal.clone())
        .await
        .map_err(|e| format!("insert: {e}"))?;
    let purged = storage
        .purge_expired_proposals(proposal.expires_at)
        .await
        .map_err(|e| format!("purge: {e}"))?;
    if purged != 0 {
        return Err(format!("purged {purged} at the exact deadline"));
    }
    Ok(())
}
