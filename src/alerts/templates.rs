use chrono::{DateTime, SecondsFormat, Utc};

use crate::{config::JobConfig, jobs::JobError};

/// Subject and bodies of an alert e-mail, before addressing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl AlertMessage {
    pub fn new(
        subject: impl Into<String>,
        text: impl Into<String>,
        html: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            text: text.into(),
            html: html.into(),
        }
    }

    pub fn job_failure(
        job: &JobConfig,
        failure_count: u32,
        error: &JobError,
        at: DateTime<Utc>,
    ) -> Self {
        let timestamp = at.to_rfc3339_opts(SecondsFormat::Secs, true);
        let headline = format!(
            "ETL job '{}' failed {failure_count} times consecutively.",
            job.name
        );
        let details = format!("{error:#?}");
        let config_json = serde_json::to_string_pretty(job).unwrap_or_else(|_| format!("{job:?}"));

        let text = format!(
            "{headline}\n\
             \n\
             Job: {name}\n\
             Consecutive failures: {failure_count}\n\
             Alert threshold: {threshold}\n\
             Time: {timestamp}\n\
             \n\
             Last error ({kind}):\n\
             {error}\n\
             \n\
             Details:\n\
             {details}\n\
             \n\
             Job configuration:\n\
             {config_json}\n",
            name = job.name,
            threshold = job.alert_threshold,
            kind = error.kind(),
        );

        let html = format!(
            "<h2>ETL Job Failure</h2>\n\
             <p>{headline}</p>\n\
             <table>\n\
             <tr><th align=\"left\">Job</th><td>{name}</td></tr>\n\
             <tr><th align=\"left\">Consecutive failures</th><td>{failure_count}</td></tr>\n\
             <tr><th align=\"left\">Alert threshold</th><td>{threshold}</td></tr>\n\
             <tr><th align=\"left\">Time</th><td>{timestamp}</td></tr>\n\
             </table>\n\
             <h3>Last error ({kind})</h3>\n\
             <pre>{error}</pre>\n\
             <h3>Details</h3>\n\
             <pre>{details}</pre>\n\
             <h3>Job configuration</h3>\n\
             <pre>{config_json}</pre>\n",
            headline = escape_html(&headline),
            name = escape_html(job.name.as_str()),
            threshold = job.alert_threshold,
            kind = error.kind(),
            error = escape_html(&error.to_string()),
            details = escape_html(&details),
            config_json = escape_html(&config_json),
        );

        Self::new(format!("ETL Job Failed: {}", job.name), text, html)
    }

    pub fn test_alert(at: DateTime<Utc>) -> Self {
        let timestamp = at.to_rfc3339_opts(SecondsFormat::Secs, true);

        Self::new(
            "Test Alert",
            format!(
                "This is a test alert from the ETL scheduler.\n\
                 If you received this, alert delivery is working.\n\
                 \n\
                 Time: {timestamp}\n"
            ),
            format!(
                "<h2>Test Alert</h2>\n\
                 <p>This is a test alert from the ETL scheduler.</p>\n\
                 <p>If you received this, alert delivery is working.</p>\n\
                 <p>Time: {timestamp}</p>\n"
            ),
        )
    }
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use crate::jobs::JobType;

    use super::*;

    fn trending() -> JobConfig {
        JobConfig {
            name: JobType::new("trending"),
            schedule: "0 */6 * * *".to_string(),
            options: serde_json::json!({ "limit": 100 }),
            alert_threshold: 3,
        }
    }

    #[test]
    fn test_job_failure_alert_contains_failure_details() {
        let error = JobError::Response {
            status: 500,
            body: "database unavailable".to_string(),
        };
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

        let alert = AlertMessage::job_failure(&trending(), 3, &error, at);

        assert_eq!(alert.subject, "ETL Job Failed: trending");
        assert!(alert.text.contains("failed 3 times consecutively"));
        assert!(alert.text.contains("ResponseError"));
        assert!(alert.text.contains("database unavailable"));
        assert!(alert.text.contains("\"limit\": 100"));
        assert!(alert.text.contains("2026-03-01T12:00:00Z"));
        assert!(alert.html.contains("failed 3 times consecutively"));
    }

    #[test]
    fn test_html_body_escapes_upstream_content() {
        let error = JobError::Response {
            status: 502,
            body: "<html>Bad Gateway</html>".to_string(),
        };

        let alert = AlertMessage::job_failure(&trending(), 3, &error, Utc::now());

        assert!(!alert.html.contains("<html>"));
        assert!(alert.html.contains("&lt;html&gt;Bad Gateway&lt;/html&gt;"));
    }

    #[test]
    fn test_test_alert_mentions_scheduler() {
        let alert = AlertMessage::test_alert(Utc::now());

        assert_eq!(alert.subject, "Test Alert");
        assert!(alert.text.contains("test alert from the ETL scheduler"));
    }
}
