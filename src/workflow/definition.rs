//! The static job poller workflow, held as an explicit transition table.
//!
//! [`WorkflowDefinition::job_poller`] assembles the canonical table once:
//!
//! ```text
//!   DoJob → CheckStatus → JobCompleted? ──FAILED──→ Failed
//!     ↑                        │ ──SUCCEEDED──→ Succeeded
//!     └──────── Wait ←─────────┘ (otherwise)
//! ```
//!
//! The definition never changes after construction. Executors read it through
//! [`WorkflowDefinition::next_state`] and the per-state [`Action`]s.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::time::Duration;

use serde_json::{Map, Value, json};

use super::context::ExecutionContext;
use super::state::{Action, ChoiceBranch, StateId, StateSpec, Transition, TransitionRule};
use super::status::{JobStatus, derive_status};
use crate::error::PollerError;

pub const FAILURE_CAUSE: &str = "Undesirable result";
pub const FAILURE_ERROR: &str = "FAILED with an odd statusCode";
pub const SUCCESS_MESSAGE: &str = "All passed!";

pub const DEFAULT_WAIT: Duration = Duration::from_secs(2);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowDefinition {
    comment: String,
    start_at: StateId,
    states: BTreeMap<StateId, StateSpec>,
    timeout: Duration,
}

impl Default for WorkflowDefinition {
    fn default() -> Self {
        Self::job_poller(DEFAULT_WAIT, DEFAULT_TIMEOUT)
    }
}

impl WorkflowDefinition {
    /// Build the job poller: run the job, derive its status, then fail,
    /// succeed, or wait `wait` and poll again. The whole execution is bounded
    /// by `timeout`.
    pub fn job_poller(wait: Duration, timeout: Duration) -> Self {
        let states = vec![
            StateSpec {
                id: StateId::DoJob,
                action: Some(Action::RunJob),
                rule: TransitionRule::Next(StateId::CheckStatus),
            },
            StateSpec {
                id: StateId::CheckStatus,
                action: Some(Action::DeriveStatus),
                rule: TransitionRule::Next(StateId::JobCompleted),
            },
            StateSpec {
                id: StateId::JobCompleted,
                action: None,
                rule: TransitionRule::Choice {
                    branches: vec![
                        ChoiceBranch {
                            when: JobStatus::Failed,
                            next: StateId::Failed,
                        },
                        ChoiceBranch {
                            when: JobStatus::Succeeded,
                            next: StateId::Succeeded,
                        },
                    ],
                    default: StateId::Wait,
                },
            },
            StateSpec {
                id: StateId::Wait,
                action: Some(Action::Wait { duration: wait }),
                rule: TransitionRule::Next(StateId::DoJob),
            },
            StateSpec {
                id: StateId::Failed,
                action: Some(Action::Fail {
                    cause: FAILURE_CAUSE.to_string(),
                    error: FAILURE_ERROR.to_string(),
                }),
                rule: TransitionRule::End,
            },
            StateSpec {
                id: StateId::Succeeded,
                action: Some(Action::Succeed {
                    message: SUCCESS_MESSAGE.to_string(),
                }),
                rule: TransitionRule::End,
            },
        ];

        Self::assemble(
            "Polls a job until it reports success or failure".to_string(),
            StateId::DoJob,
            states,
            timeout,
        )
    }

    /// Build a definition from arbitrary rows, rejecting malformed graphs.
    pub fn from_parts(
        start_at: StateId,
        states: Vec<StateSpec>,
        timeout: Duration,
    ) -> Result<Self, PollerError> {
        let mut seen = BTreeSet::new();
        for spec in &states {
            if !seen.insert(spec.id) {
                return Err(PollerError::InvalidDefinition(format!(
                    "state {} declared more than once",
                    spec.id
                )));
            }
        }
        let definition = Self::assemble(String::new(), start_at, states, timeout);
        definition.validate()?;
        Ok(definition)
    }

    fn assemble(
        comment: String,
        start_at: StateId,
        states: Vec<StateSpec>,
        timeout: Duration,
    ) -> Self {
        Self {
            comment,
            start_at,
            states: states.into_iter().map(|s| (s.id, s)).collect(),
            timeout,
        }
    }

    /// Check the structural rules every definition must satisfy: the start
    /// state exists, every edge lands on a defined state, exactly two states
    /// are terminal, and every state is reachable from the start.
    pub fn validate(&self) -> Result<(), PollerError> {
        if !self.states.contains_key(&self.start_at) {
            return Err(PollerError::InvalidDefinition(format!(
                "start state {} is not defined",
                self.start_at
            )));
        }
        if self.timeout.is_zero() {
            return Err(PollerError::InvalidDefinition(
                "timeout must be greater than zero".to_string(),
            ));
        }

        for spec in self.states.values() {
            if let TransitionRule::Choice { branches, .. } = &spec.rule
                && branches.is_empty()
            {
                return Err(PollerError::InvalidDefinition(format!(
                    "choice state {} has no branches",
                    spec.id
                )));
            }
            for target in spec.rule.targets() {
                if !self.states.contains_key(&target) {
                    return Err(PollerError::InvalidDefinition(format!(
                        "state {} transitions to undefined state {target}",
                        spec.id
                    )));
                }
            }
        }

        let terminals = self.terminal_states();
        if terminals.len() != 2 {
            return Err(PollerError::InvalidDefinition(format!(
                "expected exactly two terminal states, found {}",
                terminals.len()
            )));
        }

        let reachable = self.reachable();
        if let Some(orphan) = self.states.keys().find(|id| !reachable.contains(id)) {
            return Err(PollerError::InvalidDefinition(format!(
                "state {orphan} is unreachable from {}",
                self.start_at
            )));
        }

        Ok(())
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn start_at(&self) -> StateId {
        self.start_at
    }

    /// Execution-wide deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn states(&self) -> impl Iterator<Item = &StateSpec> {
        self.states.values()
    }

    pub fn state(&self, id: StateId) -> Result<&StateSpec, PollerError> {
        self.states.get(&id).ok_or(PollerError::UnknownState(id))
    }

    pub fn terminal_states(&self) -> Vec<StateId> {
        self.states
            .values()
            .filter(|s| s.rule.is_terminal())
            .map(|s| s.id)
            .collect()
    }

    pub fn successors(&self, id: StateId) -> Vec<StateId> {
        self.states
            .get(&id)
            .map(|s| s.rule.targets())
            .unwrap_or_default()
    }

    pub fn predecessors(&self, id: StateId) -> Vec<StateId> {
        self.states
            .values()
            .filter(|s| s.rule.targets().contains(&id))
            .map(|s| s.id)
            .collect()
    }

    /// Compute the successor of `current` given the latest context.
    ///
    /// Choice states read `status`; asking before it exists is an error.
    pub fn next_state(
        &self,
        current: StateId,
        context: &ExecutionContext,
    ) -> Result<Transition, PollerError> {
        let spec = self.state(current)?;
        match &spec.rule {
            TransitionRule::Next(next) => Ok(Transition::Next(*next)),
            TransitionRule::Choice { branches, default } => {
                let status = context.status.ok_or(PollerError::MissingField {
                    state: current,
                    field: "status",
                })?;
                let next = branches
                    .iter()
                    .find(|b| b.when == status)
                    .map(|b| b.next)
                    .unwrap_or(*default);
                Ok(Transition::Next(next))
            }
            TransitionRule::End => Ok(Transition::End),
        }
    }

    /// Apply the action of `current` when it needs no external collaborator.
    ///
    /// `DeriveStatus` overwrites `status` from `statusCode`; `Succeed` writes
    /// `finalStatus`. Every other action is left to the executor.
    pub fn apply_pure_action(
        &self,
        current: StateId,
        context: &mut ExecutionContext,
    ) -> Result<(), PollerError> {
        let spec = self.state(current)?;
        match &spec.action {
            Some(Action::DeriveStatus) => {
                let code = context.status_code.ok_or(PollerError::MissingField {
                    state: current,
                    field: "statusCode",
                })?;
                context.record_status(derive_status(code));
            }
            Some(Action::Succeed { message }) => {
                context.final_status = Some(message.clone());
            }
            _ => {}
        }
        Ok(())
    }

    fn reachable(&self) -> BTreeSet<StateId> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([self.start_at]);
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            queue.extend(self.successors(id));
        }
        seen
    }

    /// Edges that close a cycle, found by depth-first search from the start
    /// state. For the job poller this is exactly `Wait → DoJob`.
    pub fn back_edges(&self) -> Vec<(StateId, StateId)> {
        let mut on_path = BTreeSet::new();
        let mut done = BTreeSet::new();
        let mut edges = Vec::new();
        self.visit(self.start_at, &mut on_path, &mut done, &mut edges);
        edges
    }

    fn visit(
        &self,
        id: StateId,
        on_path: &mut BTreeSet<StateId>,
        done: &mut BTreeSet<StateId>,
        edges: &mut Vec<(StateId, StateId)>,
    ) {
        on_path.insert(id);
        for next in self.successors(id) {
            if on_path.contains(&next) {
                edges.push((id, next));
            } else if !done.contains(&next) {
                self.visit(next, on_path, done, edges);
            }
        }
        on_path.remove(&id);
        done.insert(id);
    }

    /// Render the definition as an Amazon States Language document.
    pub fn to_states_language(&self) -> Value {
        let mut states = Map::new();
        for spec in self.states.values() {
            states.insert(spec.id.to_string(), state_to_json(spec));
        }

        let mut doc = Map::new();
        if !self.comment.is_empty() {
            doc.insert("Comment".into(), json!(self.comment));
        }
        doc.insert("StartAt".into(), json!(self.start_at.to_string()));
        doc.insert("TimeoutSeconds".into(), json!(self.timeout.as_secs()));
        doc.insert("States".into(), Value::Object(states));
        Value::Object(doc)
    }
}

fn state_to_json(spec: &StateSpec) -> Value {
    let mut obj = Map::new();
    match &spec.action {
        Some(Action::Fail { cause, error }) => {
            obj.insert("Type".into(), json!("Fail"));
            obj.insert("Cause".into(), json!(cause));
            obj.insert("Error".into(), json!(error));
        }
        Some(Action::Wait { duration }) => {
            obj.insert("Type".into(), json!("Wait"));
            obj.insert("Seconds".into(), json!(duration.as_secs()));
        }
        Some(Action::Succeed { message }) => {
            obj.insert("Type".into(), json!("Pass"));
            obj.insert("Result".into(), json!(message));
            obj.insert("ResultPath".into(), json!("$.finalStatus"));
        }
        Some(action @ (Action::RunJob | Action::DeriveStatus)) => {
            obj.insert("Type".into(), json!("Task"));
            obj.insert("Resource".into(), json!(action.identifier()));
            if let Some(field) = action.output_field() {
                obj.insert("ResultPath".into(), json!(format!("$.{field}")));
            }
        }
        None => {
            let kind = match spec.rule {
                TransitionRule::Choice { .. } => "Choice",
                TransitionRule::Next(_) => "Pass",
                TransitionRule::End => "Succeed",
            };
            obj.insert("Type".into(), json!(kind));
        }
    }

    match &spec.rule {
        TransitionRule::Next(next) => {
            obj.insert("Next".into(), json!(next.to_string()));
        }
        TransitionRule::Choice { branches, default } => {
            let choices: Vec<Value> = branches
                .iter()
                .map(|b| {
                    json!({
                        "Variable": "$.status",
                        "StringEquals": b.when.as_str(),
                        "Next": b.next.to_string(),
                    })
                })
                .collect();
            obj.insert("Choices".into(), Value::Array(choices));
            obj.insert("Default".into(), json!(default.to_string()));
        }
        TransitionRule::End => {
            // Fail states end implicitly.
            if !matches!(spec.action, Some(Action::Fail { .. }) | None) {
                obj.insert("End".into(), json!(true));
            }
        }
    }

    Value::Object(obj)
}
