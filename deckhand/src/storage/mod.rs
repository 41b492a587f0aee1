//! On-disk layout and service settings

pub mod layout;
pub mod settings;
