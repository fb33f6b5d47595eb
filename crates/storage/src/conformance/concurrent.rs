use std::future::Future;
use std::sync::Arc;

use super::{make_next, make_proposal, make_schedule, TestResult};
use crate::{ScheduleStorage, StorageError};

/// Number of concurrent tasks to spawn in each test.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_swaps_exactly_one_wins",
        concurrent_swaps_exactly_one_wins(factory).await,
    ));
    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_takes_exactly_one_wins",
        concurrent_takes_exactly_one_wins(factory).await,
    ));
    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_initialize_exactly_one_wins",
        concurrent_initialize_exactly_one_wins(factory).await,
    ));

    results
}

// ── Concurrent swap: exactly one wins ────────────────────────────────────────

/// N tasks all swap the same schedule from version 0. Exactly one succeeds;
/// the rest must get ConcurrentConflict, and the stored schedule is the
/// winner's.
async fn concurrent_swaps_exactly_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    storage
        .initialize_schedule("plan-a", make_schedule(0))
        .await
        .map_err(|e| format!("init: {e}"))?;

    let mut handles = Vec::new();
    for i in 0..N {
        let s = storage.clone();
        handles.push(tokio::spawn(async move {
            let label = format!("writer-{i}");
            match s.swap_schedule("plan-a", 0, make_next(1, &label)).await {
                Ok(_) => Ok(Some(label)),
                Err(StorageError::ConcurrentConflict { .. }) => Ok(None),
                Err(e) => Err(e),
            }
        }));
    }

    let mut winners = Vec::new();
    let mut losers = 0usize;
    for handle in handles {
        let outcome = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e: StorageError| format!("storage error: {e}"))?;
        match outcome {
            Some(label) => winners.push(label),
            None => losers += 1,
        }
    }

    if winners.len() != 1 {
        return Err(format!("expected exactly 1 winner, got {}", winners.len()));
    }
    if losers != N - 1 {
        return Err(format!("expected {} losers, got {losers}", N - 1));
    }

    let record = storage
        .get_schedule("plan-a")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if record.version() != 1 {
        return Err(format!("expected version 1, got {}", record.version()));
    }
    if record.schedule.days()[0].label != winners[0] {
        return Err(format!(
            "stored label {:?} is not the winner's {:?}",
            record.schedule.days()[0].label,
            winners[0]
        ));
    }
    Ok(())
}

// ── Concurrent take: consume-once ────────────────────────────────────────────

async fn concurrent_takes_exactly_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    let proposal = make_proposal("plan-a", 20);
    let id = proposal.id.clone();
    storage
        .insert_proposal(proposal)
        .await
        .map_err(|e| format!("insert: {e}"))?;

    let mut handles = Vec::new();
    for _ in 0..N {
        let s = storage.clone();
        let id = id.clone();
        handles.push(tokio::spawn(async move {
            match s.take_proposal(&id).await {
                Ok(_) => Ok(true),
                Err(StorageError::ProposalNotFound { .. }) => Ok(false),
                Err(e) => Err(e),
            }
        }));
    }

    let mut winners = 0usize;
    for handle in handles {
        let won = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e: StorageError| format!("storage error: {e}"))?;
        if won {
            winners += 1;
        }
    }
    if winners != 1 {
        return Err(format!("expected exactly 1 take to succeed, got {winners}"));
    }
    Ok(())
}

// ── Concurrent initialize ────────────────────────────────────────────────────

async fn concurrent_initialize_exactly_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ScheduleStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);

    let mut handles = Vec::new();
    for _ in 0..N {
        let s = storage.clone();
        handles.push(tokio::spawn(async move {
            match s.initialize_schedule("plan-a", make_schedule(0)).await {
                Ok(_) => Ok(true),
                Err(StorageError::AlreadyInitialized { .. }) => Ok(false),
                Err(e) => Err(e),
            }
        }));
    }

    let mut winners = 0usize;
    for handle in handles {
        let won = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e: StorageError| format!("storage error: {e}"))?;
        if won {
            winners += 1;
        }
    }
    if winners != 1 {
        return Err(format!("expected exactly 1 initialize to succeed, got {winners}"));
    }
    Ok(())
}
