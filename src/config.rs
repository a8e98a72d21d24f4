use serde::{Deserialize, Serialize};

use crate::jobs::JobType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tracing: TracingConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub testing: TestingConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default = "default_jobs")]
    pub jobs: Vec<JobConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tracing: TracingConfig::default(),
            api: ApiConfig::default(),
            testing: TestingConfig::default(),
            alerts: AlertConfig::default(),
            scheduler: SchedulerConfig::default(),
            jobs: default_jobs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracingConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory holding the daily `etl-YYYY-MM-DD.log` files
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    /// Write log files in addition to the console output
    #[serde(default = "default_true")]
    pub log_to_file: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            log_to_file: true,
        }
    }
}

/// Upstream ETL API the jobs are triggered through.
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Timeout for a job request in seconds (default: 300)
    #[serde(default = "default_job_timeout")]
    pub job_timeout_seconds: u64,
    /// Timeout for the health probe in seconds (default: 5)
    #[serde(default = "default_health_timeout")]
    pub health_timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            job_timeout_seconds: default_job_timeout(),
            health_timeout_seconds: default_health_timeout(),
        }
    }
}

// Keeps the API key out of `trace!("{config:?}")` output.
impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("job_timeout_seconds", &self.job_timeout_seconds)
            .field("health_timeout_seconds", &self.health_timeout_seconds)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestingConfig {
    /// Replace upstream calls with a synthetic success
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_simulated_delay")]
    pub simulated_delay_ms: u64,
}

impl Default for TestingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            simulated_delay_ms: default_simulated_delay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AlertConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub smtp: SmtpConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default = "default_smtp_host")]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_true")]
    pub use_tls: bool,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
            username: None,
            password: None,
            use_tls: true,
        }
    }
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("use_tls", &self.use_tls)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Skip a cron tick while the previous run of the same job is unresolved
    #[serde(default = "default_true")]
    pub prevent_overlap: bool,
    /// Cron expression for the periodic health check (default: daily at midnight)
    #[serde(default = "default_health_check_schedule")]
    pub health_check_schedule: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            prevent_overlap: true,
            health_check_schedule: default_health_check_schedule(),
        }
    }
}

/// A single scheduled ETL job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: JobType,
    /// Cron expression, either 5-field unix form or 6/7-field with seconds
    pub schedule: String,
    /// Passed verbatim to the upstream endpoint
    #[serde(default = "empty_options")]
    pub options: serde_json::Value,
    /// Consecutive failures before an alert is sent
    pub alert_threshold: u32,
}

fn default_jobs() -> Vec<JobConfig> {
    vec![
        JobConfig {
            name: JobType::new("trending"),
            schedule: "0 */6 * * *".to_string(),
            options: serde_json::json!({ "limit": 100, "days": 7 }),
            alert_threshold: 3,
        },
        JobConfig {
            name: JobType::new("categories"),
            schedule: "0 2 * * *".to_string(),
            options: serde_json::json!({ "refresh": true }),
            alert_threshold: 2,
        },
        JobConfig {
            name: JobType::new("updateStats"),
            schedule: "0 * * * *".to_string(),
            options: empty_options(),
            alert_threshold: 5,
        },
    ]
}

fn empty_options() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_base_url() -> String {
    "http://localhost:3000/api/etl".to_string()
}

const fn default_job_timeout() -> u64 {
    300 // 5 minutes
}

const fn default_health_timeout() -> u64 {
    5
}

const fn default_simulated_delay() -> u64 {
    1000
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

const fn default_smtp_port() -> u16 {
    587
}

fn default_health_check_schedule() -> String {
    "0 0 * * *".to_string()
}

const fn default_true() -> bool {
    true
}
