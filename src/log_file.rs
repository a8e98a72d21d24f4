//! Tracing layer that appends every event to a per-day log file.
//!
//! Lines look like `[<timestamp>] [<LEVEL>] <message> <json fields>`, the JSON
//! object being left out when the event carries no fields.

use std::{
    fmt,
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::{
    field::{Field, Visit},
    Event, Level, Subscriber,
};
use tracing_subscriber::{layer::Context, Layer};

const FILE_PREFIX: &str = "etl";

struct OpenLog {
    date: NaiveDate,
    file: File,
}

pub struct DailyFileLayer {
    directory: PathBuf,
    current: Mutex<Option<OpenLog>>,
}

impl DailyFileLayer {
    /// Creates the log directory if needed.
    pub fn new(directory: impl Into<PathBuf>) -> io::Result<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;

        Ok(Self {
            directory,
            current: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        file_path(&self.directory, date)
    }

    fn append(&self, date: NaiveDate, line: &str) -> io::Result<()> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);

        let stale = current.as_ref().is_none_or(|log| log.date != date);
        if stale {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(file_path(&self.directory, date))?;
            *current = Some(OpenLog { date, file });
        }

        match current.as_mut() {
            Some(log) => writeln!(log.file, "{line}"),
            None => Ok(()),
        }
    }
}

impl<S> Layer<S> for DailyFileLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);

        let now = Utc::now();
        let line = format_line(
            now,
            event.metadata().level(),
            visitor.message.as_deref().unwrap_or_default(),
            &visitor.fields,
        );

        if let Err(e) = self.append(now.date_naive(), &line) {
            // Can't log through tracing from inside the subscriber.
            eprintln!("failed to write log file in {}: {e}", self.directory.display());
        }
    }
}

fn file_path(directory: &Path, date: NaiveDate) -> PathBuf {
    directory.join(format!("{FILE_PREFIX}-{}.log", date.format("%Y-%m-%d")))
}

#[must_use]
pub fn format_line(
    timestamp: DateTime<Utc>,
    level: &Level,
    message: &str,
    fields: &Map<String, Value>,
) -> String {
    let timestamp = timestamp.to_rfc3339_opts(SecondsFormat::Millis, true);
    if fields.is_empty() {
        format!("[{timestamp}] [{}] {message}", level.as_str())
    } else {
        let data = Value::Object(fields.clone());
        format!("[{timestamp}] [{}] {message} {data}", level.as_str())
    }
}

#[derive(Default)]
struct JsonVisitor {
    message: Option<String>,
    fields: Map<String, Value>,
}

impl JsonVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            self.message = Some(match value {
                Value::String(s) => s,
                other => other.to_string(),
            });
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for JsonVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::String(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::Bool(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, Value::String(value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tracing_subscriber::layer::SubscriberExt;

    use super::*;

    #[test]
    fn test_format_line_without_fields() {
        let at = Utc.with_ymd_and_hms(2026, 5, 4, 3, 2, 1).unwrap();

        let line = format_line(at, &Level::WARN, "Scheduler started", &Map::new());

        assert_eq!(line, "[2026-05-04T03:02:01.000Z] [WARN] Scheduler started");
    }

    #[test]
    fn test_format_line_appends_json_fields() {
        let at = Utc.with_ymd_and_hms(2026, 5, 4, 3, 2, 1).unwrap();
        let mut fields = Map::new();
        fields.insert("failure_number".to_string(), Value::from(2));
        fields.insert("job_type".to_string(), Value::from("trending"));

        let line = format_line(at, &Level::ERROR, "ETL job failed", &fields);

        assert_eq!(
            line,
            r#"[2026-05-04T03:02:01.000Z] [ERROR] ETL job failed {"failure_number":2,"job_type":"trending"}"#
        );
    }

    #[test]
    fn test_events_are_appended_to_todays_file() {
        let dir = tempfile::tempdir().unwrap();
        let layer = DailyFileLayer::new(dir.path().join("logs")).unwrap();
        let path = layer.path_for(Utc::now().date_naive());

        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(attempt = 1_u64, job_type = "trending", "Starting ETL job");
            tracing::error!("Upstream unreachable");
        });

        let contents = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[INFO] Starting ETL job"));
        assert!(lines[0].ends_with(r#"{"attempt":1,"job_type":"trending"}"#));
        assert!(lines[1].contains("[ERROR] Upstream unreachable"));
    }

    #[test]
    fn test_file_name_uses_date() {
        let dir = tempfile::tempdir().unwrap();
        let layer = DailyFileLayer::new(dir.path()).unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();

        assert!(layer.path_for(date).ends_with("etl-2026-12-31.log"));
    }
}
