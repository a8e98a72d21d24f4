pub mod health;
pub mod run;
pub mod start;
pub mod test_alert;

use thiserror::Error;

use crate::{app::AppError, jobs::JobError};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    App(#[from] AppError),
    #[error("Unknown job type '{job_type}'. Available job types: {available}")]
    UnknownJobType { job_type: String, available: String },
    #[error("Job failed: {0}")]
    Job(#[from] JobError),
    #[error("Invalid health check schedule: {0}")]
    HealthSchedule(#[from] cron::error::Error),
}
