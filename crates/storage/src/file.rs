//! JSON-file storage backend.
//!
//! Layout under the root directory:
//!
//! ```text
//! schedules/<schedule_id>/<version>.json   ScheduleRecord, one file per version
//! proposals/<proposal_id>.json             PatchProposal
//! ```
//!
//! Every document is written to a temporary file in its target directory
//! and then linked into place, so readers never see a torn one. Nothing is
//! rewritten in place:
//!
//! - a swap from version `v` creates `<v+1>.json` with a no-clobber rename,
//!   so of several writers racing from `v` exactly one succeeds, whichever
//!   process or handle they run in;
//! - a schedule is initialized by renaming a fully written staging
//!   directory onto `schedules/<schedule_id>`, which fails once it exists;
//! - a proposal is claimed by renaming its file to a private path first,
//!   which makes `take_proposal` consume-once.
//!
//! The current schedule is the highest version on disk. Superseded
//! versions are kept as history.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use replan_core::{CanonicalSchedule, PatchProposal, ProposalId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::{NamedTempFile, TempDir};
use time::OffsetDateTime;

use crate::error::StorageError;
use crate::record::{validate_schedule_id, ScheduleRecord};
use crate::traits::ScheduleStorage;

const SCHEDULES_DIR: &str = "schedules";
const PROPOSALS_DIR: &str = "proposals";
const CLAIM_PREFIX: &str = ".claim-";
const STAGING_PREFIX: &str = ".init-";

static PRIVATE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Storage backed by a directory of JSON documents.
///
/// Any number of handles, in any number of processes, may share one root.
pub struct FileStorage {
    root: PathBuf,
    /// Keeps a temporary root alive for the lifetime of the storage.
    _temp: Option<TempDir>,
}

impl FileStorage {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        for sub in [SCHEDULES_DIR, PROPOSALS_DIR] {
            fs::create_dir_all(root.join(sub)).map_err(|e| io_err(&root.join(sub), e))?;
        }
        tracing::debug!(root = %root.display(), "opened file storage");
        Ok(FileStorage { root, _temp: None })
    }

    /// A store in a fresh temporary directory, removed on drop.
    pub fn temporary() -> Result<Self, StorageError> {
        let temp = tempfile::tempdir().map_err(|e| StorageError::Backend(e.to_string()))?;
        let mut storage = Self::open(temp.path())?;
        storage._temp = Some(temp);
        Ok(storage)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn schedule_dir(&self, schedule_id: &str) -> PathBuf {
        self.root.join(SCHEDULES_DIR).join(schedule_id)
    }

    fn version_path(&self, schedule_id: &str, version: u64) -> PathBuf {
        self.schedule_dir(schedule_id).join(version_file(version))
    }

    /// Highest version stored for `schedule_id`.
    fn latest_version(&self, schedule_id: &str) -> Result<u64, StorageError> {
        let dir = self.schedule_dir(schedule_id);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::ScheduleNotFound {
                    schedule_id: schedule_id.to_string(),
                })
            }
            Err(e) => return Err(io_err(&dir, e)),
        };
        let mut latest = None;
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&dir, e))?;
            let name = entry.file_name();
            let version = name
                .to_str()
                .and_then(|n| n.strip_suffix(".json"))
                .and_then(|stem| stem.parse::<u64>().ok());
            if let Some(v) = version {
                latest = latest.max(Some(v));
            }
        }
        latest.ok_or_else(|| StorageError::ScheduleNotFound {
            schedule_id: schedule_id.to_string(),
        })
    }

    fn private_name(prefix: &str, key: &str) -> String {
        let n = PRIVATE_COUNTER.fetch_add(1, Ordering::Relaxed);
        format!("{}{}-{}-{}", prefix, key, std::process::id(), n)
    }

    fn proposal_path(&self, proposal_id: &ProposalId) -> PathBuf {
        self.root
            .join(PROPOSALS_DIR)
            .join(format!("{}.json", proposal_id))
    }

    fn claim_path(&self, proposal_id: &ProposalId) -> PathBuf {
        self.root
            .join(PROPOSALS_DIR)
            .join(Self::private_name(CLAIM_PREFIX, proposal_id.as_str()))
    }

    /// Rename the proposal file to a private claim path, read it, and
    /// delete it. Only one caller can win the rename.
    fn claim(&self, proposal_id: &ProposalId) -> Result<PatchProposal, StorageError> {
        let path = self.proposal_path(proposal_id);
        let claim = self.claim_path(proposal_id);
        match fs::rename(&path, &claim) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::ProposalNotFound {
                    proposal_id: proposal_id.to_string(),
                })
            }
            Err(e) => return Err(io_err(&path, e)),
        }
        let proposal = read_json(&claim);
        if let Err(e) = fs::remove_file(&claim) {
            tracing::warn!(path = %claim.display(), error = %e, "failed to remove claimed proposal");
        }
        proposal
    }
}

#[async_trait]
impl ScheduleStorage for FileStorage {
    async fn initialize_schedule(
        &self,
        schedule_id: &str,
        schedule: CanonicalSchedule,
    ) -> Result<ScheduleRecord, StorageError> {
        validate_schedule_id(schedule_id)?;
        let already = || StorageError::AlreadyInitialized {
            schedule_id: schedule_id.to_string(),
        };
        let dir = self.schedule_dir(schedule_id);
        if dir.exists() {
            return Err(already());
        }

        let record = ScheduleRecord {
            schedule_id: schedule_id.to_string(),
            schedule,
            updated_at: OffsetDateTime::now_utc(),
        };
        let staging = self
            .root
            .join(SCHEDULES_DIR)
            .join(Self::private_name(STAGING_PREFIX, schedule_id));
        fs::create_dir(&staging).map_err(|e| io_err(&staging, e))?;
        let staged = write_json_new(&staging.join(version_file(record.version())), &record)
            .and_then(|_| {
                // Fails once `dir` exists: a schedule directory is never empty.
                fs::rename(&staging, &dir).map_err(|e| io_err(&dir, e))
            });
        match staged {
            Ok(()) => Ok(record),
            Err(e) => {
                if let Err(cleanup) = fs::remove_dir_all(&staging) {
                    tracing::warn!(path = %staging.display(), error = %cleanup, "failed to remove staging directory");
                }
                if dir.exists() {
                    Err(already())
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn get_schedule(&self, schedule_id: &str) -> Result<ScheduleRecord, StorageError> {
        validate_schedule_id(schedule_id).map_err(|_| StorageError::ScheduleNotFound {
            schedule_id: schedule_id.to_string(),
        })?;
        let version = self.latest_version(schedule_id)?;
        read_json(&self.version_path(schedule_id, version))
    }

    async fn list_schedules(&self) -> Result<Vec<String>, StorageError> {
        let dir = self.root.join(SCHEDULES_DIR);
        let entries = fs::read_dir(&dir).map_err(|e| io_err(&dir, e))?;
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&dir, e))?;
            let is_dir = entry.file_type().map_err(|e| io_err(&dir, e))?.is_dir();
            match entry.file_name().to_str() {
                Some(name) if is_dir && !name.starts_with('.') => ids.push(name.to_string()),
                _ => {}
            }
        }
        ids.sort();
        Ok(ids)
    }

    async fn swap_schedule(
        &self,
        schedule_id: &str,
        expected_version: u64,
        next: CanonicalSchedule,
    ) -> Result<u64, StorageError> {
        let current = self.get_schedule(schedule_id).await?;
        let conflict = |actual_version| StorageError::ConcurrentConflict {
            schedule_id: schedule_id.to_string(),
            expected_version,
            actual_version,
        };
        if current.version() != expected_version {
            return Err(conflict(current.version()));
        }
        if expected_version.checked_add(1) != Some(next.version()) {
            return Err(StorageError::InvalidVersion {
                schedule_id: schedule_id.to_string(),
                expected_version,
                next_version: next.version(),
            });
        }
        let new_version = next.version();
        let record = ScheduleRecord {
            schedule_id: schedule_id.to_string(),
            schedule: next,
            updated_at: OffsetDateTime::now_utc(),
        };
        match write_json_new(&self.version_path(schedule_id, new_version), &record) {
            Ok(()) => Ok(new_version),
            Err(_) if self.version_path(schedule_id, new_version).exists() => {
                let actual = self.latest_version(schedule_id).unwrap_or(new_version);
                tracing::warn!(schedule_id, expected_version, actual, "lost schedule swap race");
                Err(conflict(actual))
            }
            Err(e) => Err(e),
        }
    }

    async fn insert_proposal(&self, proposal: PatchProposal) -> Result<(), StorageError> {
        if !proposal.id.is_well_formed() {
            return Err(StorageError::InvalidId {
                id: proposal.id.to_string(),
            });
        }
        let path = self.proposal_path(&proposal.id);
        if path.exists() {
            return Err(StorageError::DuplicateProposal {
                proposal_id: proposal.id.to_string(),
            });
        }
        write_json_new(&path, &proposal).map_err(|e| {
            if path.exists() {
                StorageError::DuplicateProposal {
                    proposal_id: proposal.id.to_string(),
                }
            } else {
                e
            }
        })
    }

    async fn get_proposal(&self, proposal_id: &ProposalId) -> Result<PatchProposal, StorageError> {
        let not_found = || StorageError::ProposalNotFound {
            proposal_id: proposal_id.to_string(),
        };
        if !proposal_id.is_well_formed() {
            return Err(not_found());
        }
        let path = self.proposal_path(proposal_id);
        match read_json(&path) {
            Err(StorageError::Backend(_)) if !path.exists() => Err(not_found()),
            other => other,
        }
    }

    async fn take_proposal(
        &self,
        proposal_id: &ProposalId,
    ) -> Result<PatchProposal, StorageError> {
        if !proposal_id.is_well_formed() {
            return Err(StorageError::ProposalNotFound {
                proposal_id: proposal_id.to_string(),
            });
        }
        self.claim(proposal_id)
    }

    async fn purge_expired_proposals(&self, now: OffsetDateTime) -> Result<usize, StorageError> {
        let dir = self.root.join(PROPOSALS_DIR);
        let mut purged = 0;
        for stem in json_stems(&dir)? {
            let id = ProposalId::from(stem);
            let proposal: PatchProposal = match read_json(&self.proposal_path(&id)) {
                Ok(p) => p,
                // Consumed by someone else in the meantime.
                Err(_) => continue,
            };
            if proposal.is_expired(now) && self.claim(&id).is_ok() {
                purged += 1;
            }
        }
        Ok(purged)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn io_err(path: &Path, e: io::Error) -> StorageError {
    StorageError::Backend(format!("{}: {}", path.display(), e))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    let text = fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_json::from_str(&text)
        .map_err(|e| StorageError::Backend(format!("invalid JSON in {}: {}", path.display(), e)))
}

fn version_file(version: u64) -> String {
    format!("{:020}.json", version)
}

/// Write `value` to `path`, failing if `path` already exists. The document
/// is fully written and synced before it becomes visible.
fn write_json_new<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let dir = path
        .parent()
        .ok_or_else(|| StorageError::Backend(format!("{} has no parent", path.display())))?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| StorageError::Backend(format!("serialization error: {}", e)))?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| io_err(dir, e))?;
    tmp.write_all(json.as_bytes())
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| io_err(tmp.path(), e))?;
    tmp.persist_noclobber(path)
        .map_err(|e| io_err(path, e.error))?;
    Ok(())
}

/// File stems of `*.json` entries in `dir`, skipping claim files.
fn json_stems(dir: &Path) -> Result<Vec<String>, StorageError> {
    let entries = fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    let mut stems = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.starts_with(CLAIM_PREFIX) {
            continue;
        }
        if let Some(stem) = name.strip_suffix(".json") {
            stems.push(stem.to_string());
        }
    }
    Ok(stems)
}
