//! Warnings and errors raised by the core are handed to a [`LogSink`].
//!
//! The core does not own a log format. The binary uses [`TracingSink`]; an
//! embedding UI can supply its own sink (an action log file, a status bar).

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub message: String,
}

impl LogEvent {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            severity,
            message: message.into(),
        }
    }
}

pub trait LogSink: Send + Sync {
    fn record(&self, event: LogEvent);

    fn info(&self, message: String) {
        self.record(LogEvent::new(Severity::Info, message));
    }

    fn warning(&self, message: String) {
        self.record(LogEvent::new(Severity::Warning, message));
    }

    fn error(&self, message: String) {
        self.record(LogEvent::new(Severity::Error, message));
    }
}

/// Forwards events to `tracing` at the matching level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn record(&self, event: LogEvent) {
        match event.severity {
            Severity::Info => tracing::info!(at = %event.timestamp, "{}", event.message),
            Severity::Warning => tracing::warn!(at = %event.timestamp, "{}", event.message),
            Severity::Error => tracing::error!(at = %event.timestamp, "{}", event.message),
        }
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<LogEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.severity == severity)
            .count()
    }
}

impl LogSink for MemorySink {
    fn record(&self, event: LogEvent) {
        self.events.lock().push(event);
    }
}
