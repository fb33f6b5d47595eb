//! The preview draft awaiting user confirmation.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::patch::ValidPatchSet;

/// Opaque proposal identifier: 128 random bits as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposalId(String);

impl ProposalId {
    pub fn generate() -> Self {
        let bits: u128 = rand::thread_rng().gen();
        ProposalId(format!("{:032x}", bits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the id has the generated shape. Backends that turn ids
    /// into file names rely on this to refuse path-like input.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == 32 && self.0.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl From<&str> for ProposalId {
    fn from(raw: &str) -> Self {
        ProposalId(raw.trim().to_string())
    }
}

impl From<String> for ProposalId {
    fn from(raw: String) -> Self {
        ProposalId::from(raw.as_str())
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An immutable, time-boxed, single-use bundle of validated patches.
///
/// Editing a proposal means discarding it and creating a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchProposal {
    pub id: ProposalId,
    pub schedule_id: String,
    pub patches: ValidPatchSet,
    pub schedule_version_at_creation: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl PatchProposal {
    /// Expired strictly after `expires_at`.
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now > self.expires_at
    }
}
