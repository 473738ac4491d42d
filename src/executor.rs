use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep, timeout};
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::PollerConfig;
use crate::error::PollerError;
use crate::history::{EventKind, ExecutionEvent, History, LogLevel};
use crate::runner::JobRunner;
use crate::workflow::{Action, ExecutionContext, StateId, StateSpec, Transition, WorkflowDefinition};

/// Error name reported when the job itself could not be run.
pub const TASK_FAILED_ERROR: &str = "States.TaskFailed";

/// How an execution ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionOutcome {
    Succeeded { final_status: String },
    Failed { cause: String, error: String },
    /// The execution-wide deadline elapsed. No terminal state was reached.
    TimedOut { timeout_seconds: u64 },
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Succeeded { .. })
    }

    fn event(&self) -> EventKind {
        match self {
            ExecutionOutcome::Succeeded { .. } => EventKind::ExecutionSucceeded,
            ExecutionOutcome::Failed { .. } => EventKind::ExecutionFailed,
            ExecutionOutcome::TimedOut { .. } => EventKind::ExecutionTimedOut,
        }
    }
}

/// Structured record produced when an execution ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub execution_id: Uuid,
    pub outcome: ExecutionOutcome,
    pub visited: Vec<StateId>,
    pub job_invocations: u32,
    pub context: ExecutionContext,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub events: Vec<ExecutionEvent>,
}

impl ExecutionRecord {
    pub fn to_json_pretty(&self) -> Result<String, PollerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Hooks for watching an execution as it moves between states.
pub trait ExecutionObserver {
    fn state_entered(&self, _state: StateId, _context: &ExecutionContext) {}
    fn waiting(&self, _duration: Duration) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ExecutionObserver for NoopObserver {}

// Mutable state of a single execution. Never shared between executions.
struct Run {
    id: Uuid,
    context: ExecutionContext,
    visited: Vec<StateId>,
    job_invocations: u32,
    history: History,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl Run {
    fn new(level: LogLevel) -> Self {
        Self {
            id: Uuid::new_v4(),
            context: ExecutionContext::new(),
            visited: Vec::new(),
            job_invocations: 0,
            history: History::new(level),
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    fn enter(&mut self, state: StateId) {
        self.visited.push(state);
        self.history.record(EventKind::StateEntered(state));
        debug!(state = %state, "state entered");
    }

    fn exit(&mut self, state: StateId) {
        self.history.record(EventKind::StateExited(state));
    }

    fn finish(mut self, outcome: ExecutionOutcome) -> ExecutionRecord {
        self.history.record(outcome.event());
        ExecutionRecord {
            execution_id: self.id,
            outcome,
            visited: self.visited,
            job_invocations: self.job_invocations,
            context: self.context,
            started_at: self.started_at,
            completed_at: Utc::now(),
            duration_ms: u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX),
            events: self.history.into_events(),
        }
    }
}

/// Drives executions of a [`WorkflowDefinition`] in-process.
///
/// The executor owns nothing per execution; every call to [`Executor::run`]
/// starts from a fresh context, so concurrent runs never interfere.
pub struct Executor {
    definition: WorkflowDefinition,
    log_level: LogLevel,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(WorkflowDefinition::default(), LogLevel::default())
    }
}

impl Executor {
    pub fn new(definition: WorkflowDefinition, log_level: LogLevel) -> Self {
        Self {
            definition,
            log_level,
        }
    }

    pub fn from_config(config: &PollerConfig) -> Self {
        Self::new(config.definition(), config.log_level)
    }

    pub fn definition(&self) -> &WorkflowDefinition {
        &self.definition
    }

    /// Run one execution to a terminal state or until the deadline elapses.
    ///
    /// Errors are reserved for a broken definition; job failures and timeouts
    /// are reported through [`ExecutionOutcome`].
    pub async fn run<R, O>(&self, runner: &R, observer: &O) -> Result<ExecutionRecord, PollerError>
    where
        R: JobRunner,
        O: ExecutionObserver,
    {
        self.definition.validate()?;

        let mut run = Run::new(self.log_level);
        let span = info_span!("execution", execution_id = %run.id);
        let deadline = self.definition.timeout();

        span.in_scope(|| {
            info!(
                timeout_secs = deadline.as_secs(),
                log_level = %self.log_level,
                "execution started"
            )
        });
        run.history.record(EventKind::ExecutionStarted);

        let result = timeout(deadline, self.drive(&mut run, runner, observer))
            .instrument(span.clone())
            .await;

        let outcome = match result {
            Ok(outcome) => outcome?,
            Err(_) => {
                span.in_scope(|| {
                    warn!(
                        timeout_secs = deadline.as_secs(),
                        job_invocations = run.job_invocations,
                        "execution timed out"
                    )
                });
                ExecutionOutcome::TimedOut {
                    timeout_seconds: deadline.as_secs(),
                }
            }
        };

        span.in_scope(|| info!(outcome = ?outcome, "execution finished"));
        Ok(run.finish(outcome))
    }

    async fn drive<R, O>(
        &self,
        run: &mut Run,
        runner: &R,
        observer: &O,
    ) -> Result<ExecutionOutcome, PollerError>
    where
        R: JobRunner,
        O: ExecutionObserver,
    {
        let mut current = self.definition.start_at();

        loop {
            run.enter(current);
            observer.state_entered(current, &run.context);
            let spec = self.definition.state(current)?;

            match &spec.action {
                Some(Action::RunJob) => {
                    run.job_invocations += 1;
                    match runner.run().await {
                        Ok(code) => {
                            info!(status_code = code, attempt = run.job_invocations, "job reported status");
                            run.context.record_status_code(code);
                        }
                        Err(e) => {
                            error!(error = %e, "job could not be run");
                            run.history.record(EventKind::JobFailed(e.to_string()));
                            return Ok(ExecutionOutcome::Failed {
                                cause: e.to_string(),
                                error: TASK_FAILED_ERROR.to_string(),
                            });
                        }
                    }
                }
                Some(Action::Wait { duration }) => {
                    observer.waiting(*duration);
                    sleep(*duration).await;
                }
                Some(action) if action.is_pure() => {
                    self.definition.apply_pure_action(current, &mut run.context)?;
                }
                _ => {}
            }

            run.exit(current);

            match self.definition.next_state(current, &run.context)? {
                Transition::Next(next) => current = next,
                Transition::End => return Ok(terminal_outcome(spec, &run.context)),
            }
        }
    }
}

fn terminal_outcome(spec: &StateSpec, context: &ExecutionContext) -> ExecutionOutcome {
    match &spec.action {
        Some(Action::Fail { cause, error }) => ExecutionOutcome::Failed {
            cause: cause.clone(),
            error: error.clone(),
        },
        _ => ExecutionOutcome::Succeeded {
            final_status: context.final_status.clone().unwrap_or_default(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::runner::ScriptedRunner;
    use crate::workflow::{DEFAULT_TIMEOUT, JobStatus};

    use crate::workflow::StateId::*;

    fn executor() -> Executor {
        Executor::default()
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_then_success_polls_twice() {
        let runner = ScriptedRunner::new(vec![2, 0]);
        let record = executor().run(&runner, &NoopObserver).await.unwrap();

        assert_eq!(
            record.visited,
            vec![DoJob, CheckStatus, JobCompleted, Wait, DoJob, CheckStatus, JobCompleted, Succeeded]
        );
        assert_eq!(
            record.outcome,
            ExecutionOutcome::Succeeded {
                final_status: "All passed!".into()
            }
        );
        assert_eq!(record.context.final_status.as_deref(), Some("All passed!"));
        assert_eq!(record.job_invocations, 2);
        assert_eq!(runner.calls(), 2);
        assert!(record.duration_ms >= 2000);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_status_ends_immediately() {
        let runner = ScriptedRunner::new(vec![1]);
        let record = executor().run(&runner, &NoopObserver).await.unwrap();

        assert_eq!(record.visited, vec![DoJob, CheckStatus, JobCompleted, Failed]);
        assert_eq!(
            record.outcome,
            ExecutionOutcome::Failed {
                cause: "Undesirable result".into(),
                error: "FAILED with an odd statusCode".into(),
            }
        );
        assert_eq!(record.context.status, Some(JobStatus::Failed));
        assert!(record.context.final_status.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_forever_times_out() {
        let runner = ScriptedRunner::new(vec![2]);
        let record = executor().run(&runner, &NoopObserver).await.unwrap();

        assert_eq!(
            record.outcome,
            ExecutionOutcome::TimedOut {
                timeout_seconds: DEFAULT_TIMEOUT.as_secs()
            }
        );
        assert!(!record.visited.contains(&Succeeded));
        assert!(!record.visited.contains(&Failed));
        assert!(record.context.final_status.is_none());
        assert!(record.job_invocations >= 15);
        assert!(record.duration_ms >= 30_000);
        assert_eq!(
            record.events.last().map(|e| &e.kind),
            Some(&EventKind::ExecutionTimedOut)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn status_is_overwritten_each_poll() {
        let runner = ScriptedRunner::new(vec![5, 9, 0]);
        let record = executor().run(&runner, &NoopObserver).await.unwrap();
        assert_eq!(record.context.status_code, Some(0));
        assert_eq!(record.context.status, Some(JobStatus::Succeeded));
        assert_eq!(record.job_invocations, 3);
    }

    struct BrokenRunner;

    impl JobRunner for BrokenRunner {
        async fn run(&self) -> Result<i64, PollerError> {
            Err(PollerError::Job("binary not found".into()))
        }
    }

    #[tokio::test]
    async fn runner_error_fails_execution() {
        let record = executor().run(&BrokenRunner, &NoopObserver).await.unwrap();

        assert_eq!(record.visited, vec![DoJob]);
        assert_eq!(
            record.outcome,
            ExecutionOutcome::Failed {
                cause: "Job error: binary not found".into(),
                error: TASK_FAILED_ERROR.into(),
            }
        );
        assert!(
            record
                .events
                .iter()
                .any(|e| matches!(e.kind, EventKind::JobFailed(_)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn all_level_records_every_transition() {
        let runner = ScriptedRunner::new(vec![0]);
        let record = executor().run(&runner, &NoopObserver).await.unwrap();

        let kinds: Vec<EventKind> = record.events.into_iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::ExecutionStarted,
                EventKind::StateEntered(DoJob),
                EventKind::StateExited(DoJob),
                EventKind::StateEntered(CheckStatus),
                EventKind::StateExited(CheckStatus),
                EventKind::StateEntered(JobCompleted),
                EventKind::StateExited(JobCompleted),
                EventKind::StateEntered(Succeeded),
                EventKind::StateExited(Succeeded),
                EventKind::ExecutionSucceeded,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_level_keeps_only_execution_failure() {
        let exec = Executor::new(WorkflowDefinition::default(), LogLevel::Fatal);
        let record = exec.run(&ScriptedRunner::new(vec![2, 1]), &NoopObserver).await.unwrap();

        assert_eq!(record.events.len(), 1);
        assert_eq!(record.events[0].kind, EventKind::ExecutionFailed);
    }

    #[tokio::test(start_paused = true)]
    async fn off_level_keeps_nothing() {
        let exec = Executor::new(WorkflowDefinition::default(), LogLevel::Off);
        let record = exec.run(&ScriptedRunner::new(vec![0]), &NoopObserver).await.unwrap();
        assert!(record.events.is_empty());
        assert!(record.outcome.is_success());
    }

    #[derive(Default)]
    struct Recorder {
        entered: Mutex<Vec<StateId>>,
        waits: Mutex<Vec<Duration>>,
    }

    impl ExecutionObserver for Recorder {
        fn state_entered(&self, state: StateId, _context: &ExecutionContext) {
            self.entered.lock().unwrap().push(state);
        }

        fn waiting(&self, duration: Duration) {
            self.waits.lock().unwrap().push(duration);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn observer_sees_states_and_waits() {
        let exec = Executor::from_config(&PollerConfig {
            wait_seconds: 3,
            ..Default::default()
        });
        let observer = Recorder::default();
        let record = exec
            .run(&ScriptedRunner::new(vec![4, 4, 0]), &observer)
            .await
            .unwrap();

        assert_eq!(*observer.entered.lock().unwrap(), record.visited);
        assert_eq!(
            *observer.waits.lock().unwrap(),
            vec![Duration::from_secs(3), Duration::from_secs(3)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_executions_are_isolated() {
        let exec = executor();
        let slow = ScriptedRunner::new(vec![2, 2, 0]);
        let failing = ScriptedRunner::new(vec![1]);

        let (a, b) = tokio::join!(
            exec.run(&slow, &NoopObserver),
            exec.run(&failing, &NoopObserver)
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.execution_id, b.execution_id);
        assert!(a.outcome.is_success());
        assert_eq!(a.job_invocations, 3);
        assert!(matches!(b.outcome, ExecutionOutcome::Failed { .. }));
        assert_eq!(b.job_invocations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn record_pretty_json_parses_back() {
        let record = executor()
            .run(&ScriptedRunner::new(vec![1]), &NoopObserver)
            .await
            .unwrap();
        let json = record.to_json_pretty().unwrap();
        let parsed: ExecutionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.execution_id, record.execution_id);
        assert_eq!(parsed.outcome, record.outcome);
        assert_eq!(parsed.visited, record.visited);
    }

    #[tokio::test(start_paused = true)]
    async fn record_serializes_outcome_with_result_tag() {
        let record = executor()
            .run(&ScriptedRunner::new(vec![0]), &NoopObserver)
            .await
            .unwrap();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["outcome"]["result"], "SUCCEEDED");
        assert_eq!(value["outcome"]["final_status"], "All passed!");
        assert_eq!(value["context"]["finalStatus"], "All passed!");
        assert_eq!(value["visited"][2], "JobCompleted?");
    }
}
