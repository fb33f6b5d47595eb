/// All errors that can be returned by a ScheduleStorage implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Optimistic concurrency control conflict: another writer committed a
    /// new version of the schedule since `expected_version` was read.
    #[error(
        "concurrent conflict on schedule {schedule_id}: expected version {expected_version}, found {actual_version}"
    )]
    ConcurrentConflict {
        schedule_id: String,
        expected_version: u64,
        actual_version: u64,
    },

    /// No schedule stored under this id.
    #[error("schedule not found: {schedule_id}")]
    ScheduleNotFound { schedule_id: String },

    /// A schedule with this id already exists.
    #[error("schedule already initialized: {schedule_id}")]
    AlreadyInitialized { schedule_id: String },

    /// The replacement schedule does not carry `expected_version + 1`.
    #[error(
        "invalid version for schedule {schedule_id}: swap from {expected_version} must write {}, got {next_version}",
        .expected_version + 1
    )]
    InvalidVersion {
        schedule_id: String,
        expected_version: u64,
        next_version: u64,
    },

    /// A schedule or proposal id that cannot be stored.
    #[error("invalid id: '{id}'")]
    InvalidId { id: String },

    /// Proposal unknown or already consumed.
    #[error("proposal not found: {proposal_id}")]
    ProposalNotFound { proposal_id: String },

    /// A proposal with this id is already stored.
    #[error("duplicate proposal: {proposal_id}")]
    DuplicateProposal { proposal_id: String },

    /// A backend-specific storage error (I/O, serialization, poisoned lock, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}
