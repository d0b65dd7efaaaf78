//! Tracing setup: terminal, append-only log file, and the exit summary capture

use crate::log_capture::{DEFAULT_CAPTURE_ENTRIES, LogCapture};
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Keeps the file writer flushing until dropped
///
/// Hold this for the lifetime of the process.
pub struct LoggingGuard {
    _file: WorkerGuard,
    capture: LogCapture,
}

impl LoggingGuard {
    pub fn capture(&self) -> &LogCapture {
        &self.capture
    }
}

/// Default filter when `RUST_LOG` is unset
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=warn"))
}

/// Install the global subscriber.
///
/// Events go to stdout with colors and to `log_file` as plain text,
/// appended to whatever the file already holds.
pub fn init(log_file: &Path) -> Result<LoggingGuard> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Failed to open log file '{}'", log_file.display()))?;
    let (file_writer, guard) = tracing_appender::non_blocking(file);

    let capture = LogCapture::new(DEFAULT_CAPTURE_ENTRIES);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .with(capture.layer())
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(LoggingGuard {
        _file: guard,
        capture,
    })
}
