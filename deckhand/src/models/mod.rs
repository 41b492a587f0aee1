//! Data models

pub mod catalog;
pub mod event;
pub mod playbook;
