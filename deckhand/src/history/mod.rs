//! Per-host deployment history

pub mod store;
pub mod transcript;
