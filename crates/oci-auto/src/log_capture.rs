//! Capture WARN and ERROR events for a summary at exit.
//!
//! A launch run can scroll thousands of capacity retries past the terminal.
//! The unexpected failures mixed in between are kept here and re-printed to
//! stderr once the run ends.

use std::collections::{BTreeMap, VecDeque};
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// Default number of entries kept
pub const DEFAULT_CAPTURE_ENTRIES: usize = 50;

/// A captured log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedLog {
    pub level: Level,
    pub target: String,
    pub message: String,
    /// Structured fields other than the message, formatted
    pub fields: BTreeMap<String, String>,
}

impl CapturedLog {
    fn render(&self) -> String {
        let mut line = self.message.clone();
        if let Some(attempt) = self.fields.get("attempt") {
            line = format!("(attempt {attempt}) {line}");
        }
        line
    }
}

/// Ring buffer of the most recent WARN/ERROR entries
///
/// Cheap to clone; every clone shares the same buffer.
#[derive(Debug, Clone)]
pub struct LogCapture {
    buffer: Arc<Mutex<VecDeque<CapturedLog>>>,
    max_entries: usize,
    min_level: Level,
}

impl Default for LogCapture {
    fn default() -> Self {
        Self::new(DEFAULT_CAPTURE_ENTRIES)
    }
}

impl LogCapture {
    /// Keep up to `max_entries` WARN and ERROR entries.
    pub fn new(max_entries: usize) -> Self {
        Self::with_level(max_entries, Level::WARN)
    }

    /// Keep entries at `min_level` or more severe.
    pub fn with_level(max_entries: usize, min_level: Level) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(VecDeque::with_capacity(max_entries))),
            max_entries,
            min_level,
        }
    }

    /// Layer feeding this capture
    pub fn layer(&self) -> LogCaptureLayer {
        LogCaptureLayer::new(self.clone())
    }

    /// Snapshot of the captured entries, oldest first
    pub fn entries(&self) -> Vec<CapturedLog> {
        self.lock().iter().cloned().collect()
    }

    pub fn has_entries(&self) -> bool {
        !self.lock().is_empty()
    }

    /// Print captured errors, then warnings, to stderr.
    pub fn print_to_stderr(&self) {
        let summary = self.summary();
        if !summary.is_empty() {
            eprint!("{summary}");
        }
    }

    /// Render the exit summary; empty when nothing was captured.
    pub fn summary(&self) -> String {
        let buffer = self.lock();
        let mut out = String::new();

        for (level, title) in [(Level::ERROR, "Errors"), (Level::WARN, "Warnings")] {
            let logs: Vec<_> = buffer.iter().filter(|log| log.level == level).collect();
            if logs.is_empty() {
                continue;
            }
            let _ = writeln!(out, "\n=== {title} ({}) ===", logs.len());
            for log in logs {
                let _ = writeln!(out, "[{}] {}", log.target, log.render());
            }
        }

        if !out.is_empty() {
            out.push('\n');
        }
        out
    }

    fn push(&self, log: CapturedLog) {
        let mut buffer = self.lock();
        if buffer.len() >= self.max_entries {
            buffer.pop_front();
        }
        buffer.push_back(log);
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<CapturedLog>> {
        // A panic while holding the lock leaves the buffer consistent.
        self.buffer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Collects the message and the other fields of an event
#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: BTreeMap<String, String>,
}

impl FieldVisitor {
    fn record(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }

    fn into_parts(mut self) -> (String, BTreeMap<String, String>) {
        // Events without a message fall back to their first field
        let message = match self.message.take() {
            Some(m) => m,
            None => self.fields.values().next().cloned().unwrap_or_default(),
        };
        (message, self.fields)
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record(field, value.to_string());
    }
}

/// Tracing layer that feeds a [`LogCapture`]
#[derive(Debug, Clone)]
pub struct LogCaptureLayer {
    capture: LogCapture,
}

impl LogCaptureLayer {
    pub fn new(capture: LogCapture) -> Self {
        Self { capture }
    }
}

impl<S> Layer<S> for LogCaptureLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();

        // Level ordering: TRACE > DEBUG > INFO > WARN > ERROR
        if level > self.capture.min_level {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        let (message, fields) = visitor.into_parts();

        self.capture.push(CapturedLog {
            level,
            target: event.metadata().target().to_string(),
            message,
            fields,
        });
    }
}
