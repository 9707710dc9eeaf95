//! Bounded in-memory diagnostic log.
//!
//! Keeps the most recent leveled log lines so that a UI or a health endpoint
//! can show recent activity without touching the tracing output. The buffer
//! holds at most [`DEFAULT_CAPACITY`] lines and evicts the oldest first.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Default number of lines retained.
pub const DEFAULT_CAPACITY: usize = 100;

lazy_static::lazy_static! {
    static ref GLOBAL_LOG: Arc<DiagnosticLog> = Arc::new(DiagnosticLog::new(DEFAULT_CAPACITY));
}

/// Level of a diagnostic line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    /// Map a tracing level; DEBUG and TRACE are not retained.
    pub fn from_tracing(level: &Level) -> Option<Self> {
        match *level {
            Level::ERROR => Some(LogLevel::Error),
            Level::WARN => Some(LogLevel::Warn),
            Level::INFO => Some(LogLevel::Info),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single retained line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    pub target: String,
    pub message: String,
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.level,
            self.timestamp.to_rfc3339(),
            self.message
        )
    }
}

/// Append-only ring buffer of log lines
#[derive(Debug)]
pub struct DiagnosticLog {
    capacity: usize,
    lines: Mutex<VecDeque<LogLine>>,
}

impl Default for DiagnosticLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl DiagnosticLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            lines: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Process-wide log instance.
    pub fn global() -> Arc<DiagnosticLog> {
        Arc::clone(&GLOBAL_LOG)
    }

    pub fn record(&self, level: LogLevel, message: impl Into<String>) {
        self.push(LogLine {
            level,
            timestamp: Utc::now(),
            target: String::new(),
            message: message.into(),
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.record(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.record(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.record(LogLevel::Error, message);
    }

    pub fn push(&self, line: LogLine) {
        let mut lines = self.lines.lock();
        while lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// Snapshot of retained lines, oldest first.
    pub fn history(&self) -> Vec<LogLine> {
        self.lines.lock().iter().cloned().collect()
    }

    pub fn history_by_level(&self, level: LogLevel) -> Vec<LogLine> {
        self.lines
            .lock()
            .iter()
            .filter(|line| line.level == level)
            .cloned()
            .collect()
    }

    /// Rendered `[LEVEL] timestamp: message` strings, oldest first.
    pub fn rendered(&self) -> Vec<String> {
        self.lines.lock().iter().map(ToString::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

/// Tracing layer that mirrors INFO and above into a [`DiagnosticLog`]
#[derive(Debug, Clone)]
pub struct DiagnosticLogLayer {
    log: Arc<DiagnosticLog>,
}

impl DiagnosticLogLayer {
    pub fn new(log: Arc<DiagnosticLog>) -> Self {
        Self { log }
    }

    /// Layer feeding the process-wide log.
    pub fn global() -> Self {
        Self::new(DiagnosticLog::global())
    }
}

impl<S> Layer<S> for DiagnosticLogLayer
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let Some(level) = LogLevel::from_tracing(event.metadata().level()) else {
            return;
        };

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        self.log.push(LogLine {
            level,
            timestamp: Utc::now(),
            target: event.metadata().target().to_string(),
            message: visitor.finish(),
        });
    }
}

/// Collects the message plus any structured fields as `key=value` pairs
#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
    fields: Vec<String>,
}

impl MessageVisitor {
    fn finish(self) -> String {
        let message = self.message.unwrap_or_default();
        if self.fields.is_empty() {
            message
        } else {
            format!("{} {}", message, self.fields.join(" "))
        }
    }
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    #[test]
    fn evicts_oldest_line_when_full() {
        let log = DiagnosticLog::new(3);
        for i in 0..5 {
            log.info(format!("line {}", i));
        }

        let history = log.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].message, "line 2");
        assert_eq!(history[2].message, "line 4");
    }

    #[test]
    fn default_capacity_is_one_hundred() {
        let log = DiagnosticLog::default();
        for i in 0..150 {
            log.warn(format!("w{}", i));
        }
        assert_eq!(log.len(), 100);
        assert_eq!(log.capacity(), DEFAULT_CAPACITY);
        assert_eq!(log.history()[0].message, "w50");
    }

    #[test]
    fn filters_by_level() {
        let log = DiagnosticLog::new(10);
        log.info("a");
        log.error("b");
        log.warn("c");
        log.error("d");

        let errors = log.history_by_level(LogLevel::Error);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|l| l.level == LogLevel::Error));
    }

    #[test]
    fn renders_level_prefix() {
        let log = DiagnosticLog::new(2);
        log.warn("disk almost full");
        let rendered = log.rendered();
        assert!(rendered[0].starts_with("[WARN] "));
        assert!(rendered[0].ends_with(": disk almost full"));
    }

    #[test]
    fn layer_captures_tracing_events() {
        let log = Arc::new(DiagnosticLog::new(10));
        let subscriber = Registry::default().with(DiagnosticLogLayer::new(Arc::clone(&log)));

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("not retained");
            tracing::info!(integration_id = "nlp", "registered");
            tracing::error!("boom");
        });

        let history = log.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].message, "registered integration_id=nlp");
        assert_eq!(history[1].level, LogLevel::Error);
    }
}
