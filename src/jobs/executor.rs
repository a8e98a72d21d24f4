use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::sleep;
use tracing::debug;

use crate::config::{ApiConfig, TestingConfig};

use super::{JobError, JobType};

/// Performs the actual work of a job. Swapped at construction time so
/// production and testing mode share the same runner.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    /// Runs one job and returns its result payload.
    async fn execute(&self, job_type: &JobType, options: &Value) -> Result<Value, JobError>;

    /// Short label used in logs.
    fn name(&self) -> &'static str;
}

/// Triggers jobs through the upstream ETL API.
pub struct HttpExecutor {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpExecutor {
    /// Builds the HTTP client with the job timeout. A missing API key is only
    /// reported when a job runs.
    pub fn new(config: &ApiConfig) -> Result<Self, JobError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.job_timeout_seconds))
            .build()
            .map_err(|e| JobError::Setup(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.base_url.clone(),
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
        })
    }
}

#[async_trait]
impl JobExecutor for HttpExecutor {
    async fn execute(&self, job_type: &JobType, options: &Value) -> Result<Value, JobError> {
        let Some(api_key) = &self.api_key else {
            return Err(JobError::Setup(
                "ETL API key is not configured (set ETL_API_KEY)".to_string(),
            ));
        };

        debug!(endpoint = %self.endpoint, job_type = %job_type, "Sending ETL request");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&json!({ "type": job_type, "options": options }))
            .send()
            .await
            .map_err(|e| JobError::from_transport(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| JobError::from_transport(&e))?;

        if !status.is_success() {
            return Err(JobError::Response {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Shortest delay a configured testing-mode run waits.
pub const MIN_SIMULATED_DELAY: Duration = Duration::from_millis(500);

/// Testing-mode executor: never touches the network.
pub struct SimulatedExecutor {
    delay: Duration,
}

impl SimulatedExecutor {
    /// Waits exactly `delay` per run.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Configured delay, raised to [`MIN_SIMULATED_DELAY`].
    #[must_use]
    pub fn from_config(config: &TestingConfig) -> Self {
        Self::new(Duration::from_millis(config.simulated_delay_ms).max(MIN_SIMULATED_DELAY))
    }
}

#[async_trait]
impl JobExecutor for SimulatedExecutor {
    async fn execute(&self, job_type: &JobType, options: &Value) -> Result<Value, JobError> {
        sleep(self.delay).await;

        Ok(json!({
            "simulated": true,
            "type": job_type,
            "options": options,
            "message": format!("Simulated {job_type} run completed"),
        }))
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        matchers::{body_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    fn api_config(base_url: String) -> ApiConfig {
        ApiConfig {
            base_url,
            api_key: Some("test-key".to_string()),
            ..ApiConfig::default()
        }
    }

    #[tokio::test]
    async fn test_http_executor_posts_job_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/etl"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_json(json!({ "type": "trending", "options": { "limit": 10 } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "processed": 10 })))
            .expect(1)
            .mount(&server)
            .await;

        let executor = HttpExecutor::new(&api_config(format!("{}/api/etl", server.uri()))).unwrap();
        let result = executor
            .execute(&JobType::new("trending"), &json!({ "limit": 10 }))
            .await
            .unwrap();

        assert_eq!(result, json!({ "processed": 10 }));
    }

    #[tokio::test]
    async fn test_http_executor_classifies_non_success_as_response_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let executor = HttpExecutor::new(&api_config(server.uri())).unwrap();
        let error = executor
            .execute(&JobType::new("trending"), &json!({}))
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            JobError::Response { status: 503, ref body } if body == "maintenance"
        ));
    }

    #[tokio::test]
    async fn test_http_executor_keeps_non_json_body_as_string() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let executor = HttpExecutor::new(&api_config(server.uri())).unwrap();
        let result = executor
            .execute(&JobType::new("categories"), &json!({}))
            .await
            .unwrap();

        assert_eq!(result, json!("ok"));
    }

    #[tokio::test]
    async fn test_http_executor_classifies_unreachable_host_as_network_error() {
        let executor =
            HttpExecutor::new(&api_config("http://127.0.0.1:1/api/etl".to_string())).unwrap();
        let error = executor
            .execute(&JobType::new("trending"), &json!({}))
            .await
            .unwrap_err();

        assert!(matches!(error, JobError::Network(_)), "got {error:?}");
    }

    #[tokio::test]
    async fn test_http_executor_classifies_invalid_url_as_setup_error() {
        let executor = HttpExecutor::new(&api_config("not a url".to_string())).unwrap();
        let error = executor
            .execute(&JobType::new("trending"), &json!({}))
            .await
            .unwrap_err();

        assert!(matches!(error, JobError::Setup(_)), "got {error:?}");
    }

    #[tokio::test]
    async fn test_http_executor_without_api_key_is_setup_error() {
        let config = ApiConfig {
            api_key: None,
            ..api_config("http://127.0.0.1:1".to_string())
        };
        let executor = HttpExecutor::new(&config).unwrap();
        let error = executor
            .execute(&JobType::new("trending"), &json!({}))
            .await
            .unwrap_err();

        assert!(matches!(error, JobError::Setup(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_executor_waits_and_returns_synthetic_payload() {
        let executor = SimulatedExecutor::new(Duration::from_millis(750));
        let started = tokio::time::Instant::now();

        let result = executor
            .execute(&JobType::new("trending"), &json!({ "limit": 5 }))
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_millis(750));
        assert_eq!(result["simulated"], true);
        assert_eq!(result["type"], "trending");
        assert_eq!(result["options"]["limit"], 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_configured_delay_is_raised_to_minimum() {
        let executor = SimulatedExecutor::from_config(&TestingConfig {
            enabled: true,
            simulated_delay_ms: 0,
        });
        let started = tokio::time::Instant::now();

        executor
            .execute(&JobType::new("updateStats"), &json!({}))
            .await
            .unwrap();

        assert!(started.elapsed() >= MIN_SIMULATED_DELAY);
    }
}
