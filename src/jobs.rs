pub mod executor;
pub mod failure_tracker;
pub mod job_result;
pub mod job_runner;
pub mod schedule_registry;
pub mod scheduled_job;
pub mod scheduler;

use std::{borrow::Borrow, fmt};

use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

/// Identifier of a scheduled ETL task, e.g. `trending` or `updateStats`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobType(String);

impl JobType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for JobType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Failure of a single job invocation, classified where it was observed.
#[derive(Debug, Error)]
pub enum JobError {
    /// Upstream answered with a non-2xx status
    #[error("upstream responded with status {status}: {body}")]
    Response { status: u16, body: String },
    /// The request went out but no response came back
    #[error("no response from upstream: {0}")]
    Network(String),
    /// The request could not be built or sent
    #[error("request setup failed: {0}")]
    Setup(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum JobErrorKind {
    ResponseError,
    NetworkError,
    SetupError,
}

impl JobError {
    #[must_use]
    pub const fn kind(&self) -> JobErrorKind {
        match self {
            Self::Response { .. } => JobErrorKind::ResponseError,
            Self::Network(_) => JobErrorKind::NetworkError,
            Self::Setup(_) => JobErrorKind::SetupError,
        }
    }

    /// Classifies a transport error from the HTTP client.
    pub(crate) fn from_transport(error: &reqwest::Error) -> Self {
        if error.is_builder() {
            Self::Setup(error.to_string())
        } else if error.is_timeout() {
            Self::Network(format!("request timed out: {error}"))
        } else {
            Self::Network(error.to_string())
        }
    }
}
