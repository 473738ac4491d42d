use serde::{Deserialize, Serialize};

use super::status::JobStatus;

/// The payload carried through one execution.
///
/// Each poll overwrites `status_code` and `status`; nothing accumulates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_status: Option<String>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest status code reported by the job.
    pub fn record_status_code(&mut self, code: i64) {
        self.status_code = Some(code);
    }

    pub fn record_status(&mut self, status: JobStatus) {
        self.status = Some(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_context_is_empty() {
        let ctx = ExecutionContext::new();
        assert!(ctx.status_code.is_none());
        assert!(ctx.status.is_none());
        assert!(ctx.final_status.is_none());
        assert_eq!(serde_json::to_string(&ctx).unwrap(), "{}");
    }

    #[test]
    fn poll_overwrites_previous_values() {
        let mut ctx = ExecutionContext::new();
        ctx.record_status_code(2);
        ctx.record_status(JobStatus::Unknown);
        ctx.record_status_code(0);
        ctx.record_status(JobStatus::Succeeded);
        assert_eq!(ctx.status_code, Some(0));
        assert_eq!(ctx.status, Some(JobStatus::Succeeded));
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let ctx = ExecutionContext {
            status_code: Some(0),
            status: Some(JobStatus::Succeeded),
            final_status: Some("All passed!".into()),
        };
        let value = serde_json::to_value(&ctx).unwrap();
        assert_eq!(value["statusCode"], 0);
        assert_eq!(value["status"], "SUCCEEDED");
        assert_eq!(value["finalStatus"], "All passed!");
    }
}
