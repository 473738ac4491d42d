mod context;
mod definition;
mod state;
mod status;

pub use context::ExecutionContext;
pub use definition::{
    DEFAULT_TIMEOUT, DEFAULT_WAIT, FAILURE_CAUSE, FAILURE_ERROR, SUCCESS_MESSAGE,
    WorkflowDefinition,
};
pub use state::{Action, ChoiceBranch, StateId, StateSpec, Transition, TransitionRule};
pub use status::{JobStatus, STATUS_CODE_FAILED, STATUS_CODE_SUCCEEDED, derive_status};
