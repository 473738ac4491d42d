use std::fmt;

use serde::{Deserialize, Serialize};

/// Status code reported by a job that finished successfully.
pub const STATUS_CODE_SUCCEEDED: i64 = 0;
/// Status code reported by a job that finished with a failure.
pub const STATUS_CODE_FAILED: i64 = 1;

/// Completion status derived from a job's status code.
///
/// `Unknown` means "not finished yet": the workflow waits and polls again
/// instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Succeeded,
    Failed,
    Unknown,
}

impl JobStatus {
    pub const ALL: [JobStatus; 3] = [JobStatus::Succeeded, JobStatus::Failed, JobStatus::Unknown];

    /// Map a raw status code to a status: `0` succeeded, `1` failed,
    /// anything else unknown.
    pub fn from_code(code: i64) -> Self {
        match code {
            STATUS_CODE_SUCCEEDED => JobStatus::Succeeded,
            STATUS_CODE_FAILED => JobStatus::Failed,
            _ => JobStatus::Unknown,
        }
    }

    /// Whether this status ends the polling loop.
    pub fn is_complete(self) -> bool {
        !matches!(self, JobStatus::Unknown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Succeeded => "SUCCEEDED",
            JobStatus::Failed => "FAILED",
            JobStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shorthand for [`JobStatus::from_code`].
pub fn derive_status(code: i64) -> JobStatus {
    JobStatus::from_code(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_succeeded() {
        assert_eq!(derive_status(0), JobStatus::Succeeded);
    }

    #[test]
    fn one_is_failed() {
        assert_eq!(derive_status(1), JobStatus::Failed);
    }

    #[test]
    fn every_other_code_is_unknown() {
        for code in [-1, 2, 3, 42, 255, i64::MIN, i64::MAX] {
            assert_eq!(derive_status(code), JobStatus::Unknown, "code {code}");
        }
    }

    #[test]
    fn unknown_is_not_complete() {
        assert!(JobStatus::Succeeded.is_complete());
        assert!(JobStatus::Failed.is_complete());
        assert!(!JobStatus::Unknown.is_complete());
    }

    #[test]
    fn serializes_as_upper_case_name() {
        assert_eq!(serde_json::to_string(&JobStatus::Succeeded).unwrap(), "\"SUCCEEDED\"");
        assert_eq!(serde_json::to_string(&JobStatus::Unknown).unwrap(), "\"UNKNOWN\"");
        let parsed: JobStatus = serde_json::from_str("\"FAILED\"").unwrap();
        assert_eq!(parsed, JobStatus::Failed);
    }

    #[test]
    fn display_matches_serialized_form() {
        for status in JobStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json.trim_matches('"'), status.to_string());
        }
    }
}
