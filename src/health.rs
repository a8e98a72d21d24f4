use std::{collections::BTreeMap, sync::Arc, time::Duration, time::Instant};

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    config::{ApiConfig, JobConfig},
    jobs::{failure_tracker::FailureTracker, schedule_registry::ScheduleRegistry, JobType},
};

/// Point-in-time view of the process, the upstream API and every job.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub timestamp: DateTime<Utc>,
    pub process: ProcessStats,
    pub api: ApiHealth,
    pub jobs: BTreeMap<JobType, JobHealth>,
}

/// Stats of the scheduler process itself.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessStats {
    pub pid: u32,
    pub uptime_seconds: f64,
    /// `None` where the platform does not expose it
    pub memory: Option<MemoryUsage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryUsage {
    pub resident_kb: u64,
    pub virtual_kb: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStatus {
    Ok,
    Error,
}

/// Outcome of the upstream `/health` probe.
#[derive(Debug, Clone, Serialize)]
pub struct ApiHealth {
    pub status: ApiStatus,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Failure bookkeeping and configuration of one job.
#[derive(Debug, Clone, Serialize)]
pub struct JobHealth {
    pub failure_count: u32,
    pub last_error: Option<String>,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub alerts_sent: u32,
    pub config: JobConfig,
}

/// Builds health snapshots. Never fails: probe problems become status fields.
#[derive(Debug, Clone)]
pub struct HealthChecker {
    client: Option<reqwest::Client>,
    health_url: Result<Url, String>,
    api_key: Option<String>,
    registry: Arc<ScheduleRegistry>,
    tracker: Arc<FailureTracker>,
    started_at: Instant,
}

impl HealthChecker {
    /// Uptime is measured from this call.
    pub fn new(
        api: &ApiConfig,
        registry: Arc<ScheduleRegistry>,
        tracker: Arc<FailureTracker>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(api.health_timeout_seconds))
            .build()
            .map_err(|e| warn!(error = %e, "Failed to build health check HTTP client"))
            .ok();

        Self {
            client,
            health_url: health_url(&api.base_url),
            api_key: api.api_key.clone().filter(|key| !key.is_empty()),
            registry,
            tracker,
            started_at: Instant::now(),
        }
    }

    /// Probes the upstream `/health` endpoint and collects the job counters.
    pub async fn check_health(&self) -> HealthSnapshot {
        let api = self.probe_api().await;

        let jobs = self
            .registry
            .jobs()
            .map(|job| {
                let state = self
                    .tracker
                    .state(job.job_type.as_str())
                    .unwrap_or_default();
                (
                    job.job_type.clone(),
                    JobHealth {
                        failure_count: state.consecutive_failures,
                        last_error: state.last_error,
                        last_failure_at: state.last_failure_at,
                        alerts_sent: state.alerts_sent,
                        config: job.config.clone(),
                    },
                )
            })
            .collect();

        HealthSnapshot {
            timestamp: Utc::now(),
            process: ProcessStats {
                pid: std::process::id(),
                uptime_seconds: self.started_at.elapsed().as_secs_f64(),
                memory: memory_usage(),
            },
            api,
            jobs,
        }
    }

    async fn probe_api(&self) -> ApiHealth {
        let url = match &self.health_url {
            Ok(url) => url.clone(),
            Err(e) => return ApiHealth::error(String::new(), None, e.clone()),
        };

        let Some(client) = &self.client else {
            return ApiHealth::error(url.to_string(), None, "HTTP client unavailable".to_string());
        };

        debug!(url = %url, "Probing upstream health endpoint");

        let mut request = client.get(url.clone());
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return ApiHealth::error(url.to_string(), None, e.to_string()),
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed = serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body));

        if status.is_success() {
            ApiHealth {
                status: ApiStatus::Ok,
                url: url.to_string(),
                status_code: Some(status.as_u16()),
                response: Some(parsed),
                error: None,
            }
        } else {
            ApiHealth {
                response: Some(parsed),
                ..ApiHealth::error(
                    url.to_string(),
                    Some(status.as_u16()),
                    format!("upstream responded with status {status}"),
                )
            }
        }
    }
}

impl ApiHealth {
    fn error(url: String, status_code: Option<u16>, error: String) -> Self {
        Self {
            status: ApiStatus::Error,
            url,
            status_code,
            response: None,
            error: Some(error),
        }
    }
}

/// The job endpoint with its path replaced by `/health`.
fn health_url(base_url: &str) -> Result<Url, String> {
    let mut url = Url::parse(base_url).map_err(|e| format!("Invalid API base URL '{base_url}': {e}"))?;
    url.set_path("/health");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

#[cfg(target_os = "linux")]
fn memory_usage() -> Option<MemoryUsage> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let field = |name: &str| {
        status
            .lines()
            .find_map(|line| line.strip_prefix(name))
            .and_then(|rest| rest.split_whitespace().next())
            .and_then(|kb| kb.parse::<u64>().ok())
    };

    Some(MemoryUsage {
        resident_kb: field("VmRSS:")?,
        virtual_kb: field("VmSize:")?,
    })
}

#[cfg(not(target_os = "linux"))]
fn memory_usage() -> Option<MemoryUsage> {
    None
}
