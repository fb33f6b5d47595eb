use replan_core::CanonicalSchedule;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::StorageError;

/// Longest schedule id accepted by the backends.
const MAX_ID_LEN: usize = 64;

/// A stored schedule together with its key and last write time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    pub schedule_id: String,
    pub schedule: CanonicalSchedule,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ScheduleRecord {
    pub fn version(&self) -> u64 {
        self.schedule.version()
    }
}

/// Schedule ids are 1-64 characters of ASCII letters, digits, `-` and `_`.
///
/// Every backend enforces the same rule so that ids valid for one are
/// valid for all (the file backend uses them as file names).
pub fn validate_schedule_id(schedule_id: &str) -> Result<(), StorageError> {
    let ok = !schedule_id.is_empty()
        && schedule_id.len() <= MAX_ID_LEN
        && schedule_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if ok {
        Ok(())
    } else {
        Err(StorageError::InvalidId {
            id: schedule_id.to_string(),
        })
    }
}
