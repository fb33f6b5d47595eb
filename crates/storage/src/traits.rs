use async_trait::async_trait;
use replan_core::{CanonicalSchedule, PatchProposal, ProposalId};
use time::OffsetDateTime;

use crate::error::StorageError;
use crate::record::ScheduleRecord;

/// The storage trait for replan persistence backends.
///
/// A `ScheduleStorage` implementation durably stores canonical schedules
/// keyed by id, and the pending patch proposals built against them.
///
/// ## Compare-and-swap
///
/// Schedules change only through [`swap_schedule`](Self::swap_schedule),
/// which is a single atomic compare-and-swap on the version token:
/// the write happens iff the stored version equals `expected_version`, and
/// the new schedule must carry `expected_version + 1`. On mismatch the
/// method returns `Err(StorageError::ConcurrentConflict { .. })` and the
/// stored schedule is untouched. There is no merge and no locking visible
/// to callers; a loser must re-read and re-propose.
///
/// ## Consume-once proposals
///
/// [`take_proposal`](Self::take_proposal) is delete-on-read: among any
/// number of concurrent callers for the same id, exactly one receives the
/// proposal and the rest get `ProposalNotFound`.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to be used in axum
/// application state and across async task boundaries.
#[async_trait]
pub trait ScheduleStorage: Send + Sync + 'static {
    // ── Schedules ─────────────────────────────────────────────────────────────

    /// Store a new schedule under `schedule_id`, as given (its version is
    /// kept).
    ///
    /// Returns `Err(StorageError::AlreadyInitialized)` if the id is taken.
    async fn initialize_schedule(
        &self,
        schedule_id: &str,
        schedule: CanonicalSchedule,
    ) -> Result<ScheduleRecord, StorageError>;

    /// Read the current schedule.
    ///
    /// Returns `Err(StorageError::ScheduleNotFound)` if it does not exist.
    async fn get_schedule(&self, schedule_id: &str) -> Result<ScheduleRecord, StorageError>;

    /// Ids of all stored schedules, sorted.
    async fn list_schedules(&self) -> Result<Vec<String>, StorageError>;

    /// Replace the schedule iff its stored version is `expected_version`.
    ///
    /// Returns the new version on success.
    async fn swap_schedule(
        &self,
        schedule_id: &str,
        expected_version: u64,
        next: CanonicalSchedule,
    ) -> Result<u64, StorageError>;

    // ── Proposals ─────────────────────────────────────────────────────────────

    /// Store a proposal. Returns `Err(StorageError::DuplicateProposal)` if
    /// its id is already present.
    async fn insert_proposal(&self, proposal: PatchProposal) -> Result<(), StorageError>;

    /// Read a proposal without consuming it.
    ///
    /// Returns `Err(StorageError::ProposalNotFound)` if unknown or consumed.
    async fn get_proposal(&self, proposal_id: &ProposalId) -> Result<PatchProposal, StorageError>;

    /// Remove and return a proposal (consume-once).
    ///
    /// Returns `Err(StorageError::ProposalNotFound)` if unknown or consumed.
    async fn take_proposal(&self, proposal_id: &ProposalId)
        -> Result<PatchProposal, StorageError>;

    /// Delete every proposal that is expired at `now`. Returns how many
    /// were removed.
    async fn purge_expired_proposals(&self, now: OffsetDateTime) -> Result<usize, StorageError>;
}
