//! Trendzo ETL scheduler
//!
//! Triggers the platform's ETL jobs on cron schedules through its HTTP API,
//! tracks consecutive failures per job, and emails an alert when a job keeps
//! failing.

#![allow(missing_docs)]

pub mod alerts;
pub mod app;
pub mod boot;
pub mod cli;
pub mod commands;
pub mod config;
pub mod environment;
pub mod health;
pub mod jobs;
pub mod log_file;
pub mod mailer;
pub mod setup_tracing;
