//! Deployment execution

pub mod locator;
pub mod orchestrator;
pub mod runner;
