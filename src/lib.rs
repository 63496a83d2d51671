//! ramcheck: guided RAM kit evaluation.
//!
//! Runs third-party diagnostic tools in a fixed order, copies everything it
//! prints into a timestamped session log, and pauses between steps so the
//! output can be read.

pub mod app;
pub mod cli;
pub mod config;
pub mod locate;
pub mod logging;
pub mod pipeline;
pub mod printer;
pub mod privilege;
pub mod runner;
pub mod session;
