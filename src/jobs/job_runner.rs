use std::{sync::Arc, time::Instant};

use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use super::{
    executor::JobExecutor, failure_tracker::FailureTracker, job_result::JobResult, JobError,
    JobType,
};

/// Runs one job invocation and reports its outcome to the failure tracker.
#[derive(Clone)]
pub struct JobRunner {
    executor: Arc<dyn JobExecutor>,
    tracker: Arc<FailureTracker>,
}

impl JobRunner {
    pub fn new(executor: Arc<dyn JobExecutor>, tracker: Arc<FailureTracker>) -> Self {
        Self { executor, tracker }
    }

    #[must_use]
    pub fn tracker(&self) -> &Arc<FailureTracker> {
        &self.tracker
    }

    #[must_use]
    pub fn executor_name(&self) -> &'static str {
        self.executor.name()
    }

    pub async fn run_job(&self, job_type: &JobType, options: &Value) -> Result<JobResult, JobError> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();

        info!(
            job_type = %job_type,
            %run_id,
            executor = self.executor.name(),
            options = %options,
            "🔄 Starting ETL job {job_type}"
        );

        let outcome = self.executor.execute(job_type, options).await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(result) => {
                info!(
                    job_type = %job_type,
                    %run_id,
                    duration_ms,
                    result = %result,
                    "✅ ETL job {job_type} completed"
                );
                self.tracker.record_success(job_type);
                Ok(JobResult::completed(
                    job_type.clone(),
                    result,
                    run_id,
                    duration_ms,
                ))
            }
            Err(e) => {
                error!(
                    job_type = %job_type,
                    %run_id,
                    duration_ms,
                    kind = %e.kind(),
                    error = %e,
                    "❌ ETL job {job_type} failed"
                );
                self.tracker.record_failure(job_type, &e).await;
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for JobRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRunner")
            .field("executor", &self.executor.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;
    use serde_json::json;
    use wiremock::{matchers::method, Mock, MockServer, ResponseTemplate};

    use crate::{
        alerts::AlertSender,
        config::{AlertConfig, ApiConfig},
        jobs::{
            executor::{HttpExecutor, SimulatedExecutor},
            schedule_registry::ScheduleRegistry,
        },
        mailer::Mailer,
        tests::fixtures::test_config,
    };

    use super::*;

    /// Fails a fixed number of times, then succeeds.
    struct FlakyExecutor {
        failures_left: AtomicUsize,
    }

    #[async_trait]
    impl JobExecutor for FlakyExecutor {
        async fn execute(&self, job_type: &JobType, _options: &Value) -> Result<Value, JobError> {
            let remaining = self.failures_left.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures_left.store(remaining - 1, Ordering::SeqCst);
                return Err(JobError::Network(format!("{job_type} unreachable")));
            }
            Ok(json!({ "ok": true }))
        }

        fn name(&self) -> &'static str {
            "flaky"
        }
    }

    fn tracker(alerts: AlertSender) -> Arc<FailureTracker> {
        let registry =
            Arc::new(ScheduleRegistry::from_config(&test_config("http://unused").jobs).unwrap());
        Arc::new(FailureTracker::new(registry, Arc::new(alerts)))
    }

    fn enabled_alerts(mailer: &Mailer) -> AlertSender {
        let config = AlertConfig {
            enabled: true,
            from: Some("etl@example.com".to_string()),
            to: Some("ops@example.com".to_string()),
            ..AlertConfig::default()
        };
        AlertSender::with_mailer(&config, mailer.clone())
    }

    #[tokio::test]
    async fn test_success_returns_result_and_resets_counter() {
        let tracker = tracker(AlertSender::from_config(&AlertConfig::default()));
        let executor = Arc::new(FlakyExecutor {
            failures_left: AtomicUsize::new(1),
        });
        let runner = JobRunner::new(executor, tracker.clone());
        let trending = JobType::new("trending");

        assert!(runner.run_job(&trending, &json!({})).await.is_err());
        assert_eq!(tracker.failure_count("trending"), 1);

        let result = runner.run_job(&trending, &json!({})).await.unwrap();
        assert!(result.success);
        assert_eq!(result.job_type, trending);
        assert_eq!(result.result, json!({ "ok": true }));
        assert_eq!(tracker.failure_count("trending"), 0);
    }

    #[tokio::test]
    async fn test_failure_is_recorded_and_returned() {
        let tracker = tracker(AlertSender::from_config(&AlertConfig::default()));
        let executor = Arc::new(FlakyExecutor {
            failures_left: AtomicUsize::new(5),
        });
        let runner = JobRunner::new(executor, tracker.clone());

        let error = runner
            .run_job(&JobType::new("categories"), &json!({}))
            .await
            .unwrap_err();

        assert!(matches!(error, JobError::Network(_)));
        assert_eq!(tracker.failure_count("categories"), 1);
    }

    #[tokio::test]
    async fn test_three_response_errors_send_exactly_one_alert() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .expect(3)
            .mount(&server)
            .await;

        let mailer = Mailer::mock();
        let tracker = tracker(enabled_alerts(&mailer));
        let api = ApiConfig {
            base_url: server.uri(),
            api_key: Some("key".to_string()),
            ..ApiConfig::default()
        };
        let runner = JobRunner::new(Arc::new(HttpExecutor::new(&api).unwrap()), tracker.clone());
        let trending = JobType::new("trending");

        for _ in 0..3 {
            let error = runner.run_job(&trending, &json!({})).await.unwrap_err();
            assert!(matches!(error, JobError::Response { status: 500, .. }));
        }

        let messages = mailer.messages().unwrap();
        assert_eq!(messages.len(), 1);
        let body = String::from_utf8_lossy(&messages[0].formatted()).to_string();
        assert!(body.contains("failed 3 times consecutively"));
        assert_eq!(tracker.failure_count("trending"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_testing_mode_returns_synthetic_success() {
        let tracker = tracker(AlertSender::from_config(&AlertConfig::default()));
        let runner = JobRunner::new(
            Arc::new(SimulatedExecutor::new(Duration::from_millis(1000))),
            tracker,
        );
        let started = tokio::time::Instant::now();

        let result = runner
            .run_job(&JobType::new("trending"), &json!({ "limit": 100 }))
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_millis(500));
        assert_eq!(runner.executor_name(), "simulated");
        assert_eq!(result.result["simulated"], true);
    }
}
