//! Job poller workflow: run a job, derive its status, then succeed, fail, or
//! wait and poll again until an execution-wide deadline.
//!
//! [`workflow`] holds the static definition as an explicit transition table.
//! [`executor`] drives it in-process with a pluggable [`runner::JobRunner`].

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod history;
pub mod runner;
pub mod telemetry;
pub mod ui;
pub mod workflow;

pub use error::PollerError;
