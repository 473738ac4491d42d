use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::status::JobStatus;

/// The named states of the job poller workflow.
///
/// An execution flows: DoJob → CheckStatus → JobCompleted? → {Wait → DoJob, Failed, Succeeded}
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StateId {
    DoJob,
    CheckStatus,
    #[serde(rename = "JobCompleted?")]
    JobCompleted,
    Wait,
    Failed,
    Succeeded,
}

impl StateId {
    pub const ALL: [StateId; 6] = [
        StateId::DoJob,
        StateId::CheckStatus,
        StateId::JobCompleted,
        StateId::Wait,
        StateId::Failed,
        StateId::Succeeded,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StateId::DoJob => "DoJob",
            StateId::CheckStatus => "CheckStatus",
            StateId::JobCompleted => "JobCompleted?",
            StateId::Wait => "Wait",
            StateId::Failed => "Failed",
            StateId::Succeeded => "Succeeded",
        }
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The side effect a state asks its executor to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Invoke the job and record its integer status code.
    RunJob,
    /// Map the recorded status code to a [`JobStatus`].
    DeriveStatus,
    /// Suspend the execution, then resume at the state's successor.
    Wait { duration: Duration },
    /// End the execution as failed.
    Fail { cause: String, error: String },
    /// End the execution as succeeded, recording a final message.
    Succeed { message: String },
}

impl Action {
    /// Stable identifier an executor dispatches on.
    pub fn identifier(&self) -> &'static str {
        match self {
            Action::RunJob => "job-poller:run-job",
            Action::DeriveStatus => "job-poller:derive-status",
            Action::Wait { .. } => "job-poller:wait",
            Action::Fail { .. } => "job-poller:fail",
            Action::Succeed { .. } => "job-poller:succeed",
        }
    }

    /// Context field the action writes, if any.
    pub fn output_field(&self) -> Option<&'static str> {
        match self {
            Action::RunJob => Some("statusCode"),
            Action::DeriveStatus => Some("status"),
            Action::Succeed { .. } => Some("finalStatus"),
            Action::Wait { .. } | Action::Fail { .. } => None,
        }
    }

    /// Whether the action can be applied without an external collaborator.
    pub fn is_pure(&self) -> bool {
        matches!(self, Action::DeriveStatus | Action::Succeed { .. })
    }
}

/// A labeled conditional edge: taken when the latest status equals `when`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChoiceBranch {
    pub when: JobStatus,
    pub next: StateId,
}

/// How a state picks its successor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionRule {
    /// Always move to the given state.
    Next(StateId),
    /// First branch whose status matches wins, otherwise `default`.
    Choice {
        branches: Vec<ChoiceBranch>,
        default: StateId,
    },
    /// Terminal state.
    End,
}

impl TransitionRule {
    /// Every state this rule can lead to, in declaration order.
    pub fn targets(&self) -> Vec<StateId> {
        match self {
            TransitionRule::Next(next) => vec![*next],
            TransitionRule::Choice { branches, default } => {
                let mut targets: Vec<StateId> = branches.iter().map(|b| b.next).collect();
                targets.push(*default);
                targets
            }
            TransitionRule::End => Vec::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransitionRule::End)
    }
}

/// One row of the transition table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSpec {
    pub id: StateId,
    pub action: Option<Action>,
    pub rule: TransitionRule,
}

/// The result of evaluating a state's transition rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Advance to the given state.
    Next(StateId),
    /// The current state is terminal.
    End,
}
