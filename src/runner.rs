//! Implementations of the `DoJob` action.
//!
//! A [`JobRunner`] runs the job once and reports its integer status code.
//! The executor calls it on every visit to `DoJob`, so runners must tolerate
//! being invoked repeatedly; nothing deduplicates the calls.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;
use tokio::process::Command;

use crate::error::PollerError;

/// Runs the job once and returns its status code.
pub trait JobRunner {
    fn run(&self) -> impl Future<Output = Result<i64, PollerError>> + Send;
}

/// Replays a fixed list of status codes, repeating the last one forever
/// once the list is exhausted.
#[derive(Debug)]
pub struct ScriptedRunner {
    codes: Vec<i64>,
    calls: AtomicUsize,
}

impl ScriptedRunner {
    pub fn new(codes: Vec<i64>) -> Self {
        Self {
            codes,
            calls: AtomicUsize::new(0),
        }
    }

    /// How many times the job has been invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl JobRunner for ScriptedRunner {
    async fn run(&self) -> Result<i64, PollerError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let last = self
            .codes
            .len()
            .checked_sub(1)
            .ok_or_else(|| PollerError::Job("no status codes scripted".to_string()))?;
        Ok(self.codes[call.min(last)])
    }
}

/// Runs a shell command; its exit code is the status code.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    command: String,
}

impl CommandRunner {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl JobRunner for CommandRunner {
    async fn run(&self) -> Result<i64, PollerError> {
        let status = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .kill_on_drop(true)
            .status()
            .await?;
        status.code().map(i64::from).ok_or_else(|| {
            PollerError::Job(format!("`{}` was terminated by a signal", self.command))
        })
    }
}

/// Reports a uniformly random code in `0..3`: success, failure, or "not done
/// yet" with equal odds. Useful for demos.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomRunner;

impl JobRunner for RandomRunner {
    async fn run(&self) -> Result<i64, PollerError> {
        Ok(rand::rng().random_range(0..3))
    }
}
