//! Execution history: the timestamped events an execution emits, and the
//! verbosity filter that decides which of them are kept.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflow::StateId;

/// How much of an execution's history is recorded.
///
/// Mirrors the managed runtime's log levels: `All` keeps everything, `Error`
/// keeps failures of any kind, `Fatal` keeps only execution-ending failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Off,
    Fatal,
    Error,
    #[default]
    All,
}

impl LogLevel {
    /// Whether an event of the given severity passes this level.
    pub fn admits(self, severity: Severity) -> bool {
        match self {
            LogLevel::Off => false,
            LogLevel::Fatal => severity == Severity::Fatal,
            LogLevel::Error => severity >= Severity::Error,
            LogLevel::All => true,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Off => "OFF",
            LogLevel::Fatal => "FATAL",
            LogLevel::Error => "ERROR",
            LogLevel::All => "ALL",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Error,
    Fatal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail")]
pub enum EventKind {
    ExecutionStarted,
    StateEntered(StateId),
    StateExited(StateId),
    JobFailed(String),
    ExecutionSucceeded,
    ExecutionFailed,
    ExecutionTimedOut,
}

impl EventKind {
    pub fn severity(&self) -> Severity {
        match self {
            EventKind::ExecutionStarted
            | EventKind::StateEntered(_)
            | EventKind::StateExited(_)
            | EventKind::ExecutionSucceeded => Severity::Info,
            EventKind::JobFailed(_) => Severity::Error,
            EventKind::ExecutionFailed | EventKind::ExecutionTimedOut => Severity::Fatal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
}

/// Append-only event log for one execution, filtered by a [`LogLevel`].
#[derive(Debug, Clone, Default)]
pub struct History {
    level: LogLevel,
    events: Vec<ExecutionEvent>,
}

impl History {
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            events: Vec::new(),
        }
    }

    /// Record an event if the level admits it. Returns whether it was kept.
    pub fn record(&mut self, kind: EventKind) -> bool {
        if !self.level.admits(kind.severity()) {
            return false;
        }
        self.events.push(ExecutionEvent {
            timestamp: Utc::now(),
            kind,
        });
        true
    }

    pub fn events(&self) -> &[ExecutionEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<ExecutionEvent> {
        self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<EventKind> {
        vec![
            EventKind::ExecutionStarted,
            EventKind::StateEntered(StateId::DoJob),
            EventKind::JobFailed("exit by signal".into()),
            EventKind::StateExited(StateId::DoJob),
            EventKind::ExecutionFailed,
            EventKind::ExecutionTimedOut,
        ]
    }

    fn kept(level: LogLevel) -> usize {
        let mut history = History::new(level);
        for kind in sample() {
            history.record(kind);
        }
        history.events().len()
    }

    #[test]
    fn all_keeps_everything() {
        assert_eq!(kept(LogLevel::All), 6);
    }

    #[test]
    fn error_keeps_failures() {
        assert_eq!(kept(LogLevel::Error), 3);
    }

    #[test]
    fn fatal_keeps_execution_failures() {
        assert_eq!(kept(LogLevel::Fatal), 2);
    }

    #[test]
    fn off_keeps_nothing() {
        assert_eq!(kept(LogLevel::Off), 0);
    }

    #[test]
    fn log_level_display_matches_config_spelling() {
        for level in [LogLevel::All, LogLevel::Error, LogLevel::Fatal, LogLevel::Off] {
            let toml_value = toml::Value::try_from(level).unwrap();
            assert_eq!(toml_value.as_str(), Some(level.to_string().as_str()));
        }
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let event = ExecutionEvent {
            timestamp: Utc::now(),
            kind: EventKind::StateEntered(StateId::JobCompleted),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["kind"]["type"], "StateEntered");
        assert_eq!(value["kind"]["detail"], "JobCompleted?");
        assert!(value.get("timestamp").is_some());
    }
}
