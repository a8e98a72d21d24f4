use tracing::{error, info};

use crate::{app::App, jobs::job_result::JobResult};

use super::CommandError;

/// Runs one job by name. Unknown names fail before any request is made.
pub async fn handle_run_command(app: &App, job_type: &str) -> Result<JobResult, CommandError> {
    let Some(job) = app.registry.get(job_type) else {
        let available = app
            .registry
            .job_types()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        error!(job_type, available = %available, "❌ Unknown job type");
        return Err(CommandError::UnknownJobType {
            job_type: job_type.to_string(),
            available,
        });
    };

    info!(job_type = %job.job_type, "▶️ Running {} manually", job.job_type);

    let result = app.runner.run_job(&job.job_type, &job.config.options).await?;

    info!(
        job_type = %job.job_type,
        run_id = %result.run_id,
        duration_ms = result.duration_ms,
        result = %result.result,
        "✅ Manual run of {} finished",
        job.job_type
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wiremock::{matchers::method, Mock, MockServer, ResponseTemplate};

    use crate::{environment::Environment, tests::fixtures::test_config};

    use super::*;

    #[tokio::test]
    async fn test_unknown_job_type_fails_without_http_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let app = App::from_config(test_config(&server.uri()), Environment::Test).unwrap();
        let error = handle_run_command(&app, "unknownType").await.unwrap_err();

        match error {
            CommandError::UnknownJobType { job_type, available } => {
                assert_eq!(job_type, "unknownType");
                assert_eq!(available, "categories, trending, updateStats");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_known_job_posts_configured_options() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(wiremock::matchers::body_partial_json(serde_json::json!({
                "type": "trending",
                "options": { "limit": 100 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "rows": 42 })))
            .expect(1)
            .mount(&server)
            .await;

        let app = App::from_config(test_config(&server.uri()), Environment::Test).unwrap();
        let result = handle_run_command(&app, "trending").await.unwrap();

        assert_eq!(result.result["rows"], 42);
    }

    #[tokio::test]
    async fn test_failed_job_surfaces_as_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let app = App::from_config(test_config(&server.uri()), Environment::Test).unwrap();
        let error = handle_run_command(&app, "updateStats").await.unwrap_err();

        assert!(matches!(error, CommandError::Job(_)));
        assert_eq!(app.tracker.failure_count("updateStats"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_testing_mode_run_makes_no_request() {
        let mut config = test_config("http://127.0.0.1:1");
        config.testing.enabled = true;
        let app = App::from_config(config, Environment::Test).unwrap();
        let started = tokio::time::Instant::now();

        let result = handle_run_command(&app, "trending").await.unwrap();

        assert!(result.success);
        assert_eq!(result.result["simulated"], true);
        assert!(started.elapsed() >= Duration::from_millis(500));
    }
}
