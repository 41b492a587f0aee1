//! Deckhand Library
//!
//! Deployment execution and per-host history, plus the thin HTTP layer in
//! front of it.

pub mod app;
pub mod catalog;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod history;
pub mod logs;
pub mod models;
pub mod server;
pub mod storage;
pub mod utils;
