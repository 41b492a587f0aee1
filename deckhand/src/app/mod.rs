//! Service wiring

pub mod run;
