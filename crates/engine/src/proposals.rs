//! Proposal/preview store.
//!
//! A thin service over [`ScheduleStorage`] that stamps proposals with an id
//! and a time-to-live, and refuses to hand out expired ones.

use replan_core::{CanonicalSchedule, PatchProposal, ProposalId, ValidPatchSet};
use replan_storage::{ScheduleStorage, StorageError};
use time::{Duration, OffsetDateTime};

use crate::clock::Clock;
use crate::config::DEFAULT_TTL_MINUTES;

#[derive(Debug, thiserror::Error)]
pub enum ProposalError {
    #[error("proposal {proposal_id} not found (unknown or already used)")]
    NotFound { proposal_id: String },
    #[error("proposal {proposal_id} expired at {expires_at}")]
    Expired {
        proposal_id: String,
        expires_at: OffsetDateTime,
    },
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for ProposalError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::ProposalNotFound { proposal_id } => {
                ProposalError::NotFound { proposal_id }
            }
            other => ProposalError::Storage(other),
        }
    }
}

/// Proposal store bound to a storage backend and a clock.
pub struct ProposalBook<'a, S, C: ?Sized> {
    storage: &'a S,
    clock: &'a C,
    ttl: Duration,
}

impl<'a, S, C> ProposalBook<'a, S, C>
where
    S: ScheduleStorage,
    C: Clock + ?Sized,
{
    pub fn new(storage: &'a S, clock: &'a C) -> Self {
        ProposalBook {
            storage,
            clock,
            ttl: Duration::minutes(i64::from(DEFAULT_TTL_MINUTES)),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Store a new proposal for `patches`, pinned to the schedule's
    /// current version.
    pub async fn create(
        &self,
        schedule_id: &str,
        patches: &ValidPatchSet,
        schedule: &CanonicalSchedule,
    ) -> Result<PatchProposal, StorageError> {
        let created_at = self.clock.now();
        let proposal = PatchProposal {
            id: ProposalId::generate(),
            schedule_id: schedule_id.to_string(),
            patches: patches.clone(),
            schedule_version_at_creation: schedule.version(),
            created_at,
            expires_at: created_at + self.ttl,
        };
        self.storage.insert_proposal(proposal.clone()).await?;
        tracing::info!(
            proposal_id = %proposal.id,
            schedule_id,
            version = proposal.schedule_version_at_creation,
            patches = patches.len(),
            "proposal created"
        );
        Ok(proposal)
    }

    /// Read a live proposal.
    pub async fn get(&self, id: &ProposalId) -> Result<PatchProposal, ProposalError> {
        let proposal = self.storage.get_proposal(id).await?;
        self.check_live(proposal)
    }

    /// Remove a proposal and return it if still live.
    ///
    /// An expired proposal is removed all the same and reported as
    /// `Expired`, so it can never be used afterwards.
    pub async fn consume(&self, id: &ProposalId) -> Result<PatchProposal, ProposalError> {
        let proposal = self.storage.take_proposal(id).await?;
        self.check_live(proposal)
    }

    /// Drop a proposal without applying it.
    pub async fn discard(&self, id: &ProposalId) -> Result<(), ProposalError> {
        self.storage.take_proposal(id).await?;
        tracing::info!(proposal_id = %id, "proposal discarded");
        Ok(())
    }

    pub async fn purge_expired(&self) -> Result<usize, StorageError> {
        let purged = self
            .storage
            .purge_expired_proposals(self.clock.now())
            .await?;
        if purged > 0 {
            tracing::info!(purged, "expired proposals purged");
        }
        Ok(purged)
    }

    fn check_live(&self, proposal: PatchProposal) -> Result<PatchProposal, ProposalError> {
        if proposal.is_expired(self.clock.now()) {
            tracing::warn!(proposal_id = %proposal.id, expires_at = %proposal.expires_at, "proposal expired");
            return Err(ProposalError::Expired {
                proposal_id: proposal.id.to_string(),
                expires_at: proposal.expires_at,
            });
        }
        Ok(proposal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use replan_core::{validate, Category, DayRecord, ProposedPatch, ValidatorConfig};
    use replan_storage::MemoryStorage;
    use time::macros::{date, datetime};

    fn schedule() -> CanonicalSchedule {
        CanonicalSchedule::new(
            date!(2025 - 02 - 10),
            vec![
                DayRecord::new(date!(2025 - 02 - 10), "Easy 40 min", Category::Active),
                DayRecord::new(date!(2025 - 02 - 11), "Intervals", Category::Active),
            ],
        )
        .unwrap()
    }

    fn patches(schedule: &CanonicalSchedule) -> ValidPatchSet {
        validate(
            &[ProposedPatch::cancel("2025-02-11")],
            schedule,
            &ValidatorConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn create_stamps_version_and_ttl() {
        let storage = MemoryStorage::new();
        let clock = FixedClock::new(datetime!(2025-02-10 09:00 UTC));
        let book = ProposalBook::new(&storage, &clock).with_ttl(Duration::minutes(15));
        let schedule = schedule();

        let proposal = book
            .create("plan", &patches(&schedule), &schedule)
            .await
            .unwrap();
        assert_eq!(proposal.schedule_version_at_creation, 0);
        assert_eq!(proposal.created_at, datetime!(2025-02-10 09:00 UTC));
        assert_eq!(proposal.expires_at, datetime!(2025-02-10 09:15 UTC));
        assert_eq!(book.get(&proposal.id).await.unwrap(), proposal);
    }

    #[tokio::test]
    async fn get_reports_expired_instead_of_stale_data() {
        let storage = MemoryStorage::new();
        let clock = FixedClock::new(datetime!(2025-02-10 09:00 UTC));
        let book = ProposalBook::new(&storage, &clock);
        let schedule = schedule();
        let proposal = book
            .create("plan", &patches(&schedule), &schedule)
            .await
            .unwrap();

        clock.advance(Duration::minutes(20));
        assert!(book.get(&proposal.id).await.is_ok());
        clock.advance(Duration::seconds(1));
        assert!(matches!(
            book.get(&proposal.id).await,
            Err(ProposalError::Expired { .. })
        ));
    }

    #[tokio::test]
    async fn consume_is_single_use_even_when_expired() {
        let storage = MemoryStorage::new();
        let clock = FixedClock::new(datetime!(2025-02-10 09:00 UTC));
        let book = ProposalBook::new(&storage, &clock);
        let schedule = schedule();
        let proposal = book
            .create("plan", &patches(&schedule), &schedule)
            .await
            .unwrap();

        clock.advance(Duration::hours(1));
        assert!(matches!(
            book.consume(&proposal.id).await,
            Err(ProposalError::Expired { .. })
        ));
        assert!(matches!(
            book.consume(&proposal.id).await,
            Err(ProposalError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn discard_then_purge() {
        let storage = MemoryStorage::new();
        let clock = FixedClock::new(datetime!(2025-02-10 09:00 UTC));
        let book = ProposalBook::new(&storage, &clock);
        let schedule = schedule();
        let set = patches(&schedule);

        let kept = book.create("plan", &set, &schedule).await.unwrap();
        let dropped = book.create("plan", &set, &schedule).await.unwrap();
        book.discard(&dropped.id).await.unwrap();
        assert!(matches!(
            book.discard(&dropped.id).await,
            Err(ProposalError::NotFound { .. })
        ));

        assert_eq!(book.purge_expired().await.unwrap(), 0);
        clock.advance(Duration::minutes(21));
        assert_eq!(book.purge_expired().await.unwrap(), 1);
        assert!(matches!(
            book.get(&kept.id).await,
            Err(ProposalError::NotFound { .. })
        ));
    }
}
