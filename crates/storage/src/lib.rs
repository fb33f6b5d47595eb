mod error;
mod file;
mod memory;
mod record;
mod traits;

pub mod conformance;

pub use error::StorageError;
pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use record::{validate_schedule_id, ScheduleRecord};
pub use traits::ScheduleStorage;
