use std::fmt::{Display, Formatter, Result};

use serde::Serialize;
use uuid::Uuid;

use super::JobType;

/// Outcome of a successful job invocation.
#[derive(Debug, Clone, Serialize)]
pub struct JobResult {
    pub success: bool,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub result: serde_json::Value,
    pub run_id: Uuid,
    pub duration_ms: u64,
}

impl JobResult {
    pub(crate) fn completed(
        job_type: JobType,
        result: serde_json::Value,
        run_id: Uuid,
        duration_ms: u64,
    ) -> Self {
        Self {
            success: true,
            job_type,
            result,
            run_id,
            duration_ms,
        }
    }
}

impl Display for JobResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(
            f,
            "{}({}) completed in {}ms",
            self.job_type, self.run_id, self.duration_ms
        )
    }
}
