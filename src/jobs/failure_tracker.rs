use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::alerts::{AlertDelivery, AlertMessage, AlertSender};

use super::{schedule_registry::ScheduleRegistry, JobError, JobType};

/// Consecutive-failure bookkeeping for one job type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FailureState {
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub alerts_sent: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureOutcome {
    /// Serial number of this failure within the current streak
    pub failure_number: u32,
    /// Delivery result when this failure crossed the threshold
    pub alert: Option<AlertDelivery>,
}

impl FailureOutcome {
    #[must_use]
    pub const fn alert_triggered(&self) -> bool {
        self.alert.is_some()
    }
}

/// Owns the per-job failure counters and decides when to alert.
///
/// A counter reaching its job's threshold triggers one alert and is reset to
/// zero in the same step, so the next alert needs a full new streak.
#[derive(Debug)]
pub struct FailureTracker {
    registry: Arc<ScheduleRegistry>,
    alerts: Arc<AlertSender>,
    states: DashMap<JobType, FailureState>,
}

impl FailureTracker {
    /// Starts every registered job type at zero failures.
    pub fn new(registry: Arc<ScheduleRegistry>, alerts: Arc<AlertSender>) -> Self {
        let states = registry
            .job_types()
            .map(|job_type| (job_type.clone(), FailureState::default()))
            .collect();

        Self {
            registry,
            alerts,
            states,
        }
    }

    /// Resets the streak. Never alerts.
    pub fn record_success(&self, job_type: &JobType) {
        let mut state = self.states.entry(job_type.clone()).or_default();
        if state.consecutive_failures > 0 {
            debug!(
                job_type = %job_type,
                previous_failures = state.consecutive_failures,
                "Resetting failure counter after success"
            );
        }
        state.consecutive_failures = 0;
    }

    /// Counts a failure and, when the job's threshold is reached, sends the
    /// alert and starts a new streak.
    pub async fn record_failure(&self, job_type: &JobType, error: &JobError) -> FailureOutcome {
        let job = self.registry.get(job_type.as_str());
        let threshold = job.map(|job| job.config.alert_threshold);
        let now = Utc::now();

        // The guard must be gone before the alert is awaited.
        let (failure_number, crossed) = {
            let mut state = self.states.entry(job_type.clone()).or_default();
            state.consecutive_failures += 1;
            state.last_error = Some(error.to_string());
            state.last_failure_at = Some(now);

            let failure_number = state.consecutive_failures;
            let crossed = threshold.is_some_and(|t| failure_number >= t);
            if crossed {
                state.consecutive_failures = 0;
                state.alerts_sent += 1;
            }
            (failure_number, crossed)
        };

        warn!(
            job_type = %job_type,
            failure_number,
            threshold = ?threshold,
            kind = %error.kind(),
            error = %error,
            "⚠️ ETL job failure #{failure_number}"
        );

        let Some(job) = job.filter(|_| crossed) else {
            if threshold.is_none() {
                warn!(job_type = %job_type, "No alert threshold registered for job type");
            }
            return FailureOutcome {
                failure_number,
                alert: None,
            };
        };

        info!(
            job_type = %job_type,
            failure_number,
            "🚨 Alert threshold reached, sending alert and resetting counter"
        );

        let alert = AlertMessage::job_failure(&job.config, failure_number, error, now);
        let delivery = self.alerts.send_alert(&alert).await;

        FailureOutcome {
            failure_number,
            alert: Some(delivery),
        }
    }

    /// Current streak length, 0 for unknown job types.
    #[must_use]
    pub fn failure_count(&self, job_type: &str) -> u32 {
        self.states
            .get(job_type)
            .map_or(0, |state| state.consecutive_failures)
    }

    /// Copy of the full bookkeeping for one job type.
    #[must_use]
    pub fn state(&self, job_type: &str) -> Option<FailureState> {
        self.states.get(job_type).map(|state| state.clone())
    }

    /// Current counters, ordered by job type.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<JobType, u32> {
        self.states
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().consecutive_failures))
            .collect()
    }
}
