//! Patch application engine.
//!
//! Consumes a proposal, checks it against the stored schedule's version,
//! builds the next schedule copy-on-write and swaps it in with a single
//! compare-and-swap. Either the whole patch set lands with the version
//! bumped by one, or nothing is written.

use replan_core::{apply_patches, DayChange, ProposalId, RejectionReport};
use replan_storage::{ScheduleStorage, StorageError};
use serde::Serialize;
use time::OffsetDateTime;

use crate::clock::Clock;
use crate::proposals::{ProposalBook, ProposalError};

/// Outcome of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitResult {
    pub schedule_id: String,
    pub proposal_id: ProposalId,
    pub previous_version: u64,
    pub new_version: u64,
    /// Exactly the dates that changed, with labels before and after.
    pub changes: Vec<DayChange>,
}

#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    #[error("proposal {proposal_id} not found (unknown or already used)")]
    NotFound { proposal_id: String },
    #[error("proposal {proposal_id} expired at {expires_at}; request the change again")]
    Expired {
        proposal_id: String,
        expires_at: OffsetDateTime,
    },
    #[error(
        "schedule {schedule_id} is at version {current}, not {submitted}; reload it and propose again"
    )]
    Conflict {
        schedule_id: String,
        submitted: u64,
        current: u64,
    },
    #[error("{0}")]
    Rejected(RejectionReport),
    #[error(transparent)]
    Storage(StorageError),
}

impl From<ProposalError> for CommitError {
    fn from(e: ProposalError) -> Self {
        match e {
            ProposalError::NotFound { proposal_id } => CommitError::NotFound { proposal_id },
            ProposalError::Expired {
                proposal_id,
                expires_at,
            } => CommitError::Expired {
                proposal_id,
                expires_at,
            },
            ProposalError::Storage(e) => CommitError::Storage(e),
        }
    }
}

/// Apply the proposal `proposal_id` to its schedule.
///
/// 1. Consume the proposal (a second commit of the same id is `NotFound`).
/// 2. Refuse it if expired.
/// 3. Refuse with `Conflict` unless both `submitted_version` and the
///    proposal's own creation version equal the stored version.
/// 4. Build the patched schedule (version + 1).
/// 5. Swap it in; a lost race at the storage boundary is also `Conflict`.
pub async fn commit<S, C>(
    storage: &S,
    clock: &C,
    proposal_id: &ProposalId,
    submitted_version: u64,
) -> Result<CommitResult, CommitError>
where
    S: ScheduleStorage,
    C: Clock + ?Sized,
{
    let proposal = ProposalBook::new(storage, clock).consume(proposal_id).await?;
    let schedule_id = proposal.schedule_id.clone();

    let record = storage
        .get_schedule(&schedule_id)
        .await
        .map_err(CommitError::Storage)?;
    let current = record.version();

    if submitted_version != current || proposal.schedule_version_at_creation != current {
        let submitted = if submitted_version != current {
            submitted_version
        } else {
            proposal.schedule_version_at_creation
        };
        tracing::warn!(%proposal_id, %schedule_id, submitted, current, "commit conflict");
        return Err(CommitError::Conflict {
            schedule_id,
            submitted,
            current,
        });
    }

    let applied = apply_patches(&record.schedule, &proposal.patches).map_err(|e| {
        tracing::warn!(%proposal_id, %schedule_id, error = %e, "proposal no longer applies");
        CommitError::Rejected(e.into_report(proposal.patches.len()))
    })?;

    let new_version = match storage
        .swap_schedule(&schedule_id, current, applied.schedule)
        .await
    {
        Ok(v) => v,
        Err(StorageError::ConcurrentConflict { actual_version, .. }) => {
            tracing::warn!(%proposal_id, %schedule_id, submitted = current, current = actual_version, "commit lost the race");
            return Err(CommitError::Conflict {
                schedule_id,
                submitted: current,
                current: actual_version,
            });
        }
        Err(e) => return Err(CommitError::Storage(e)),
    };

    tracing::info!(
        %proposal_id,
        %schedule_id,
        previous_version = current,
        new_version,
        changed = applied.changes.len(),
        "proposal committed"
    );

    Ok(CommitResult {
        schedule_id,
        proposal_id: proposal.id,
        previous_version: current,
        new_version,
        changes: applied.changes,
    })
}
