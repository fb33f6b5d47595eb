//! In-process storage backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use replan_core::{CanonicalSchedule, PatchProposal, ProposalId};
use time::OffsetDateTime;

use crate::error::StorageError;
use crate::record::{validate_schedule_id, ScheduleRecord};
use crate::traits::ScheduleStorage;

/// Storage held in memory behind a mutex.
///
/// Every trait method runs as one critical section, which makes
/// `swap_schedule` a true compare-and-swap and `take_proposal` a true
/// delete-on-read. Clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Default)]
struct MemoryInner {
    schedules: BTreeMap<String, ScheduleRecord>,
    proposals: HashMap<ProposalId, PatchProposal>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryInner>, StorageError> {
        self.inner
            .lock()
            .map_err(|_| StorageError::Backend("memory storage lock poisoned".to_string()))
    }
}

#[async_trait]
impl ScheduleStorage for MemoryStorage {
    async fn initialize_schedule(
        &self,
        schedule_id: &str,
        schedule: CanonicalSchedule,
    ) -> Result<ScheduleRecord, StorageError> {
        validate_schedule_id(schedule_id)?;
        let mut inner = self.lock()?;
        if inner.schedules.contains_key(schedule_id) {
            return Err(StorageError::AlreadyInitialized {
                schedule_id: schedule_id.to_string(),
            });
        }
        let record = ScheduleRecord {
            schedule_id: schedule_id.to_string(),
            schedule,
            updated_at: OffsetDateTime::now_utc(),
        };
        inner
            .schedules
            .insert(schedule_id.to_string(), record.clone());
        Ok(record)
    }

    async fn get_schedule(&self, schedule_id: &str) -> Result<ScheduleRecord, StorageError> {
        self.lock()?
            .schedules
            .get(schedule_id)
            .cloned()
            .ok_or_else(|| StorageError::ScheduleNotFound {
                schedule_id: schedule_id.to_string(),
            })
    }

    async fn list_schedules(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.lock()?.schedules.keys().cloned().collect())
    }

    async fn swap_schedule(
        &self,
        schedule_id: &str,
        expected_version: u64,
        next: CanonicalSchedule,
    ) -> Result<u64, StorageError> {
        let mut inner = self.lock()?;
        let record = inner
            .schedules
            .get_mut(schedule_id)
            .ok_or_else(|| StorageError::ScheduleNotFound {
                schedule_id: schedule_id.to_string(),
            })?;
        if record.schedule.version() != expected_version {
            return Err(StorageError::ConcurrentConflict {
                schedule_id: schedule_id.to_string(),
                expected_version,
                actual_version: record.schedule.version(),
            });
        }
        if next.version() != expected_version + 1 {
            return Err(StorageError::InvalidVersion {
                schedule_id: schedule_id.to_string(),
                expected_version,
                next_version: next.version(),
            });
        }
        let new_version = next.version();
        record.schedule = next;
        record.updated_at = OffsetDateTime::now_utc();
        Ok(new_version)
    }

    async fn insert_proposal(&self, proposal: PatchProposal) -> Result<(), StorageError> {
        if !proposal.id.is_well_formed() {
            return Err(StorageError::InvalidId {
                id: proposal.id.to_string(),
            });
        }
        let mut inner = self.lock()?;
        if inner.proposals.contains_key(&proposal.id) {
            return Err(StorageError::DuplicateProposal {
                proposal_id: proposal.id.to_string(),
            });
        }
        inner.proposals.insert(proposal.id.clone(), proposal);
        Ok(())
    }

    async fn get_proposal(&self, proposal_id: &ProposalId) -> Result<PatchProposal, StorageError> {
        self.lock()?
            .proposals
            .get(proposal_id)
            .cloned()
            .ok_or_else(|| StorageError::ProposalNotFound {
                proposal_id: proposal_id.to_string(),
            })
    }

    async fn take_proposal(
        &self,
        proposal_id: &ProposalId,
    ) -> Result<PatchProposal, StorageError> {
        self.lock()?
            .proposals
            .remove(proposal_id)
            .ok_or_else(|| StorageError::ProposalNotFound {
                proposal_id: proposal_id.to_string(),
            })
    }

    async fn purge_expired_proposals(&self, now: OffsetDateTime) -> Result<usize, StorageError> {
        let mut inner = self.lock()?;
        let before = inner.proposals.len();
        inner.proposals.retain(|_, p| !p.is_expired(now));
        Ok(before - inner.proposals.len())
    }
}
