use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::{
    alerts::AlertSender,
    config::Config,
    environment::Environment,
    health::HealthChecker,
    jobs::{
        executor::{HttpExecutor, JobExecutor, SimulatedExecutor},
        failure_tracker::FailureTracker,
        job_runner::JobRunner,
        schedule_registry::{RegistryError, ScheduleRegistry},
        JobError,
    },
};

/// Everything a command needs, wired once from configuration.
#[derive(Clone, Debug)]
pub struct App {
    pub config: Config,
    pub environment: Environment,
    pub registry: Arc<ScheduleRegistry>,
    pub tracker: Arc<FailureTracker>,
    pub alerts: Arc<AlertSender>,
    pub runner: JobRunner,
    pub health: HealthChecker,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid job configuration: {0}")]
    Registry(#[from] RegistryError),
    #[error("Failed to set up job executor: {0}")]
    Executor(#[from] JobError),
}

impl App {
    /// Picks the simulated executor in testing mode and the HTTP one otherwise.
    pub fn from_config(config: Config, environment: Environment) -> Result<Self, AppError> {
        let executor: Arc<dyn JobExecutor> = if config.testing.enabled {
            info!(
                delay_ms = config.testing.simulated_delay_ms,
                "🧪 Testing mode enabled, upstream calls are simulated"
            );
            Arc::new(SimulatedExecutor::from_config(&config.testing))
        } else {
            Arc::new(HttpExecutor::new(&config.api)?)
        };
        let alerts = AlertSender::from_config(&config.alerts);

        Self::with_parts(config, environment, executor, alerts)
    }

    pub fn with_parts(
        config: Config,
        environment: Environment,
        executor: Arc<dyn JobExecutor>,
        alerts: AlertSender,
    ) -> Result<Self, AppError> {
        let registry = Arc::new(ScheduleRegistry::from_config(&config.jobs)?);
        let alerts = Arc::new(alerts);
        let tracker = Arc::new(FailureTracker::new(registry.clone(), alerts.clone()));
        let runner = JobRunner::new(executor, tracker.clone());
        let health = HealthChecker::new(&config.api, registry.clone(), tracker.clone());

        debug!(
            jobs = registry.len(),
            executor = runner.executor_name(),
            alerts_enabled = alerts.is_enabled(),
            "Application wired"
        );

        Ok(Self {
            config,
            environment,
            registry,
            tracker,
            alerts,
            runner,
            health,
        })
    }
}
