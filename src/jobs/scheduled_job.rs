use std::str::FromStr;

use crate::config::JobConfig;

use super::JobType;

/// A validated registry entry: the job's configuration plus its parsed cron schedule.
#[derive(Debug, Clone)]
pub struct ScheduledJob {
    pub job_type: JobType,
    pub config: JobConfig,
    pub schedule: cron::Schedule,
}

/// Parses a cron expression, accepting the 5-field unix form by prepending a
/// zero seconds field.
pub fn parse_schedule(expression: &str) -> Result<cron::Schedule, cron::error::Error> {
    let trimmed = expression.trim();
    if trimmed.split_whitespace().count() == 5 {
        cron::Schedule::from_str(&format!("0 {trimmed}"))
    } else {
        cron::Schedule::from_str(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Timelike, Utc};

    use super::*;

    #[test]
    fn test_five_field_expression_fires_on_the_minute() {
        let schedule = parse_schedule("30 2 * * *").unwrap();
        let after = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let next = schedule.after(&after).next().unwrap();

        assert_eq!((next.hour(), next.minute(), next.second()), (2, 30, 0));
    }

    #[test]
    fn test_six_field_expression_is_used_as_is() {
        let schedule = parse_schedule("15 * * * * *").unwrap();
        let after = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let next = schedule.after(&after).next().unwrap();

        assert_eq!(next.second(), 15);
    }

    #[test]
    fn test_invalid_expression_is_rejected() {
        assert!(parse_schedule("every day at noon").is_err());
        assert!(parse_schedule("61 * * * *").is_err());
    }
}
