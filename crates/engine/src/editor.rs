//! `ScheduleEditor`: the single entry point the presentation layer talks to.

use replan_core::{
    resolve_with, validate, PatchProposal, ProposalId, ProposedPatch, RejectionReport,
    ResolveError, Resolution,
};
use replan_storage::{ScheduleRecord, ScheduleStorage, StorageError};
use time::Date;

use crate::clock::Clock;
use crate::commit::{commit, CommitError, CommitResult};
use crate::config::EngineConfig;
use crate::proposals::{ProposalBook, ProposalError};

#[derive(Debug, thiserror::Error)]
pub enum ProposeError {
    #[error("{0}")]
    Rejected(RejectionReport),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, thiserror::Error)]
pub enum ResolvePhraseError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Storage, clock and configuration bundled behind the operations a
/// caller needs: resolve phrases, propose patches, inspect or discard a
/// proposal, and commit it.
pub struct ScheduleEditor<S, C> {
    storage: S,
    clock: C,
    config: EngineConfig,
    today: Option<Date>,
}

impl<S, C> ScheduleEditor<S, C>
where
    S: ScheduleStorage,
    C: Clock,
{
    pub fn new(storage: S, clock: C, config: EngineConfig) -> Self {
        ScheduleEditor {
            storage,
            clock,
            config,
            today: None,
        }
    }

    /// Pin the reference date used for phrase resolution. Proposal expiry
    /// still follows the clock.
    pub fn with_today(mut self, today: Date) -> Self {
        self.today = Some(today);
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn today(&self) -> Date {
        self.today.unwrap_or_else(|| self.clock.today())
    }

    pub fn proposals(&self) -> ProposalBook<'_, S, C> {
        ProposalBook::new(&self.storage, &self.clock).with_ttl(self.config.proposals.ttl())
    }

    pub async fn schedule(&self, schedule_id: &str) -> Result<ScheduleRecord, StorageError> {
        self.storage.get_schedule(schedule_id).await
    }

    /// Resolve one phrase. With a schedule id, the schedule's anchor date
    /// fills in the rolling week number of the result.
    pub async fn resolve(
        &self,
        schedule_id: Option<&str>,
        phrase: &str,
    ) -> Result<Resolution, ResolvePhraseError> {
        let anchor = self.anchor_of(schedule_id).await?;
        Ok(self.resolve_on(phrase, self.today(), anchor)?)
    }

    /// Resolve several phrases against the same reference date. Each phrase
    /// gets its own result; only a storage failure fails the whole call.
    pub async fn resolve_all<P: AsRef<str>>(
        &self,
        schedule_id: Option<&str>,
        phrases: &[P],
    ) -> Result<Vec<Result<Resolution, ResolveError>>, StorageError> {
        let anchor = self.anchor_of(schedule_id).await?;
        let today = self.today();
        Ok(phrases
            .iter()
            .map(|p| self.resolve_on(p.as_ref(), today, anchor))
            .collect())
    }

    /// Resolve with a caller-supplied reference date and anchor, using the
    /// configured ambiguity thresholds.
    pub fn resolve_on(
        &self,
        phrase: &str,
        today: Date,
        anchor: Option<Date>,
    ) -> Result<Resolution, ResolveError> {
        let resolution = resolve_with(phrase, today, anchor, &self.config.resolution);
        match &resolution {
            Ok(Resolution::Resolved(target)) => {
                tracing::debug!(phrase, %today, date = %target.date, "phrase resolved")
            }
            Ok(Resolution::Ambiguous(a)) => {
                tracing::debug!(phrase, %today, candidates = a.candidates.len(), "phrase ambiguous")
            }
            Err(e) => tracing::debug!(phrase, %today, error = %e, "phrase not resolved"),
        }
        resolution
    }

    /// Anchor date of the named schedule, or `None` without a name.
    pub async fn anchor_of(&self, schedule_id: Option<&str>) -> Result<Option<Date>, StorageError> {
        match schedule_id {
            Some(id) => Ok(Some(self.storage.get_schedule(id).await?.schedule.anchor_date())),
            None => Ok(None),
        }
    }

    /// Validate `drafts` against the current schedule and store the result
    /// as a proposal awaiting confirmation.
    pub async fn propose(
        &self,
        schedule_id: &str,
        drafts: &[ProposedPatch],
    ) -> Result<PatchProposal, ProposeError> {
        let record = self.storage.get_schedule(schedule_id).await?;
        let patches = validate(drafts, &record.schedule, &self.config.validation).map_err(|report| {
            tracing::warn!(
                schedule_id,
                violations = report.violations.len(),
                "patch set rejected"
            );
            ProposeError::Rejected(report)
        })?;
        Ok(self
            .proposals()
            .create(schedule_id, &patches, &record.schedule)
            .await?)
    }

    pub async fn proposal(&self, id: &ProposalId) -> Result<PatchProposal, ProposalError> {
        self.proposals().get(id).await
    }

    pub async fn discard(&self, id: &ProposalId) -> Result<(), ProposalError> {
        self.proposals().discard(id).await
    }

    pub async fn commit(
        &self,
        id: &ProposalId,
        submitted_version: u64,
    ) -> Result<CommitResult, CommitError> {
        commit(&self.storage, &self.clock, id, submitted_version).await
    }

    pub async fn purge_expired(&self) -> Result<usize, StorageError> {
        self.proposals().purge_expired().await
    }
}
