//! Logging setup
//!
//! Operator output owns stdout, so tracing events go to a per-run log file.
//! Warnings and errors are mirrored to stderr.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "migrator=info";

/// `<YYYYmmddHHMMSS>.log`
pub fn log_file_name(at: DateTime<Local>) -> String {
    format!("{}.log", at.format("%Y%m%d%H%M%S"))
}

/// Expand `~` in the configured log directory
pub fn resolve_log_dir(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

/// Install the global subscriber
///
/// # Environment Variables
///
/// - `RUST_LOG`: filter directives (default: `migrator=info`)
/// - `MIGRATOR_LOG_FORMAT`: `json` or `pretty` (default)
///
/// Keep the returned guard alive until exit so buffered lines are flushed.
pub fn init_logging(log_dir: &Path, format: &str) -> Result<(WorkerGuard, PathBuf)> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let file_name = log_file_name(Local::now());
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(&file_name)
        .build(log_dir)
        .context("Failed to open log file")?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .context("Failed to create env filter")?;
    let stderr = std::io::stderr.with_max_level(Level::WARN);

    match format {
        "json" => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(file_writer))
                .with(fmt::layer().with_writer(stderr))
                .try_init()
                .context("Failed to install tracing subscriber")?;
        }
        _ => {
            // Development: human-readable, no colors in the file
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_ansi(false).with_writer(file_writer))
                .with(fmt::layer().with_writer(stderr))
                .try_init()
                .context("Failed to install tracing subscriber")?;
        }
    }

    Ok((guard, log_dir.join(file_name)))
}
