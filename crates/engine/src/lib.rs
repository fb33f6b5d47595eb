//! replan-engine: the stateful half of replan.
//!
//! Wires the pure core to a [`ScheduleStorage`](replan_storage::ScheduleStorage)
//! backend and a [`Clock`]:
//!
//! - [`ProposalBook`] -- time-boxed, single-use proposals
//! - [`commit()`] -- version-checked, all-or-nothing application
//! - [`ScheduleEditor`] -- facade over both plus phrase resolution
//! - [`EngineConfig`] -- `replan.toml` settings

pub mod clock;
pub mod commit;
pub mod config;
pub mod editor;
pub mod proposals;

pub use clock::{Clock, FixedClock, SystemClock};
pub use commit::{commit, CommitError, CommitResult};
pub use config::{ClockConfig, ConfigError, EngineConfig, ProposalConfig, DEFAULT_TTL_MINUTES};
pub use editor::{ProposeError, ResolvePhraseError, ScheduleEditor};
pub use proposals::{ProposalBook, ProposalError};
