use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tokio::{
    task::JoinHandle,
    time::{sleep, sleep_until, Instant},
};
use tracing::{debug, error, info, warn};

use crate::{
    app::App,
    health::{ApiStatus, HealthChecker},
};

use super::{
    job_runner::JobRunner,
    schedule_registry::ScheduleRegistry,
    scheduled_job::{parse_schedule, ScheduledJob},
};

/// Scheduler that spawns one timing task per job type plus the health check task.
pub struct Scheduler {
    registry: Arc<ScheduleRegistry>,
    runner: JobRunner,
    health: HealthChecker,
    health_schedule: cron::Schedule,
    prevent_overlap: bool,
    task_handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(app: &App) -> Result<Self, cron::error::Error> {
        Ok(Self {
            registry: app.registry.clone(),
            runner: app.runner.clone(),
            health: app.health.clone(),
            health_schedule: parse_schedule(&app.config.scheduler.health_check_schedule)?,
            prevent_overlap: app.config.scheduler.prevent_overlap,
            task_handles: Vec::new(),
        })
    }

    /// Runs until the process is stopped.
    pub async fn run(&mut self) {
        info!(
            jobs = self.registry.len(),
            prevent_overlap = self.prevent_overlap,
            "📅 Scheduler started with {} scheduled jobs",
            self.registry.len()
        );

        for job in self.registry.jobs() {
            let job = job.clone();
            let runner = self.runner.clone();
            let prevent_overlap = self.prevent_overlap;

            info!(
                job_type = %job.job_type,
                schedule = %job.config.schedule,
                "📅 Scheduling {}",
                job.job_type
            );

            self.task_handles.push(tokio::spawn(async move {
                run_scheduled_job(job, runner, prevent_overlap).await;
            }));
        }

        let health = self.health.clone();
        let health_schedule = self.health_schedule.clone();
        self.task_handles.push(tokio::spawn(async move {
            run_health_checks(health_schedule, health).await;
        }));

        for (index, result) in join_all(self.task_handles.drain(..)).await.into_iter().enumerate() {
            if let Err(e) = result {
                error!("📅 Scheduler task {} failed: {}", index, e);
            }
        }
    }
}

/// Run a single scheduled job in its own loop
async fn run_scheduled_job(job: ScheduledJob, runner: JobRunner, prevent_overlap: bool) {
    debug!(job_type = %job.job_type, "📅 Starting scheduler task");

    let in_flight = Arc::new(AtomicUsize::new(0));
    let mut last_fired = None;

    loop {
        let now = Utc::now();
        let Some(next_execution) = next_occurrence(&job.schedule, last_fired, now) else {
            error!(
                job_type = %job.job_type,
                "❌ Could not determine next execution time"
            );
            sleep(Duration::from_secs(60)).await;
            continue;
        };

        debug!(
            job_type = %job.job_type,
            "🔄 Next execution at: {}",
            next_execution.format("%Y-%m-%d %H:%M:%S UTC")
        );

        wait_until_execution_time(next_execution, now).await;
        last_fired = Some(next_execution);

        fire_tick(&job, &runner, &in_flight, prevent_overlap);
    }
}

/// The first occurrence after both `now` and the previously fired one, so a
/// wall clock stepping backwards cannot repeat an occurrence.
fn next_occurrence(
    schedule: &cron::Schedule,
    last_fired: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let anchor = last_fired.map_or(now, |last| last.max(now));
    schedule.after(&anchor).next()
}

/// Holds one slot of a job's in-flight count; released on drop, panics included.
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Starts one run of `job` unless a previous one is unresolved and overlap
/// prevention is on. Returns the handle of the spawned run.
pub(crate) fn fire_tick(
    job: &ScheduledJob,
    runner: &JobRunner,
    in_flight: &Arc<AtomicUsize>,
    prevent_overlap: bool,
) -> Option<JoinHandle<()>> {
    if prevent_overlap {
        if in_flight
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(
                job_type = %job.job_type,
                "⏭️ Skipping scheduled run, previous run still in flight"
            );
            return None;
        }
    } else {
        let running = in_flight.fetch_add(1, Ordering::AcqRel);
        if running > 0 {
            warn!(
                job_type = %job.job_type,
                running,
                "Previous run still in flight, starting an overlapping run"
            );
        }
    }
    let guard = InFlightGuard(in_flight.clone());

    let job_type = job.job_type.clone();
    let options = job.config.options.clone();
    let runner = runner.clone();

    Some(tokio::spawn(async move {
        let _guard = guard;
        info!(job_type = %job_type, "⏰ Scheduled run of {job_type} starting");

        match runner.run_job(&job_type, &options).await {
            Ok(result) => info!(
                job_type = %job_type,
                run_id = %result.run_id,
                duration_ms = result.duration_ms,
                "Scheduled run of {job_type} completed"
            ),
            Err(e) => error!(
                job_type = %job_type,
                error = %e,
                "Scheduled run of {job_type} failed"
            ),
        }
    }))
}

async fn run_health_checks(schedule: cron::Schedule, health: HealthChecker) {
    debug!("🩺 Starting health check task");

    let mut last_fired = None;

    loop {
        let now = Utc::now();
        let Some(next_execution) = next_occurrence(&schedule, last_fired, now) else {
            error!("❌ Could not determine next health check time");
            sleep(Duration::from_secs(60)).await;
            continue;
        };

        wait_until_execution_time(next_execution, now).await;
        last_fired = Some(next_execution);

        let snapshot = health.check_health().await;
        let report = serde_json::to_string(&snapshot).unwrap_or_default();
        match snapshot.api.status {
            ApiStatus::Ok => info!(snapshot = %report, "🩺 Health check completed"),
            ApiStatus::Error => warn!(
                snapshot = %report,
                error = snapshot.api.error.as_deref().unwrap_or_default(),
                "🩺 Health check found upstream API unhealthy"
            ),
        }
    }
}

/// Wait until the specified execution time
async fn wait_until_execution_time(next_execution: DateTime<Utc>, now: DateTime<Utc>) {
    let sleep_duration = (next_execution - now).to_std().unwrap_or_default();
    if sleep_duration > Duration::ZERO {
        sleep_until(Instant::now() + sleep_duration).await;
    }
}
