pub(crate) mod proposal;
pub(crate) mod resolve;
pub(crate) mod schedule;
