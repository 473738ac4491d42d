use thiserror::Error;

use crate::workflow::StateId;

#[derive(Debug, Error)]
pub enum PollerError {
    #[error("Invalid workflow definition: {0}")]
    InvalidDefinition(String),

    #[error("State not defined in workflow: {0}")]
    UnknownState(StateId),

    #[error("State {state} needs `{field}` but it has not been computed yet")]
    MissingField { state: StateId, field: &'static str },

    #[error("Job error: {0}")]
    Job(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_display() {
        let err = PollerError::MissingField {
            state: StateId::JobCompleted,
            field: "status",
        };
        assert_eq!(
            err.to_string(),
            "State JobCompleted? needs `status` but it has not been computed yet"
        );
    }

    #[test]
    fn unknown_state_display() {
        let err = PollerError::UnknownState(StateId::Wait);
        assert_eq!(err.to_string(), "State not defined in workflow: Wait");
    }

    #[test]
    fn json_errors_convert() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = PollerError::from(source);
        assert!(matches!(err, PollerError::Json(_)));
        assert!(err.to_string().starts_with("JSON error: "));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PollerError>();
    }
}
