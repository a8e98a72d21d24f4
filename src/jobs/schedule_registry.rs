use std::collections::BTreeMap;

use thiserror::Error;

use crate::config::JobConfig;

use super::{
    scheduled_job::{parse_schedule, ScheduledJob},
    JobType,
};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid cron expression '{expression}' for job '{job_type}': {source}")]
    InvalidSchedule {
        job_type: JobType,
        expression: String,
        source: cron::error::Error,
    },
    #[error("Alert threshold for job '{0}' must be at least 1")]
    ZeroThreshold(JobType),
    #[error("Job '{0}' is configured more than once")]
    Duplicate(JobType),
}

/// Static job configuration, validated once at startup.
#[derive(Debug, Clone, Default)]
pub struct ScheduleRegistry {
    jobs: BTreeMap<JobType, ScheduledJob>,
}

impl ScheduleRegistry {
    pub fn from_config(jobs: &[JobConfig]) -> Result<Self, RegistryError> {
        let mut registry = BTreeMap::new();

        for job in jobs {
            if job.alert_threshold == 0 {
                return Err(RegistryError::ZeroThreshold(job.name.clone()));
            }

            let schedule =
                parse_schedule(&job.schedule).map_err(|source| RegistryError::InvalidSchedule {
                    job_type: job.name.clone(),
                    expression: job.schedule.clone(),
                    source,
                })?;

            let entry = ScheduledJob {
                job_type: job.name.clone(),
                config: job.clone(),
                schedule,
            };

            if registry.insert(job.name.clone(), entry).is_some() {
                return Err(RegistryError::Duplicate(job.name.clone()));
            }
        }

        Ok(Self { jobs: registry })
    }

    #[must_use]
    pub fn get(&self, job_type: &str) -> Option<&ScheduledJob> {
        self.jobs.get(job_type)
    }

    #[must_use]
    pub fn alert_threshold(&self, job_type: &str) -> Option<u32> {
        self.get(job_type).map(|job| job.config.alert_threshold)
    }

    pub fn jobs(&self) -> impl Iterator<Item = &ScheduledJob> {
        self.jobs.values()
    }

    pub fn job_types(&self) -> impl Iterator<Item = &JobType> {
        self.jobs.keys()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
