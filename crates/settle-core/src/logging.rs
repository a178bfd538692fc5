#![forbid(unsafe_code)]

//! Tracing layer that formats events as plain lines.
//!
//! [`LineLayer`] is a `tracing_subscriber::Layer` that renders each event as
//! one line and hands it to a [`LogSink`]: standard error for binaries, or an
//! in-memory [`LogCapture`] so tests can assert on what the pipeline logged.
//!
//! # Quick Start
//!
//! ```no_run
//! settle_core::logging::init("settle=debug").ok();
//! ```
//!
//! # Capturing in tests
//!
//! ```
//! use settle_core::logging::{LineLayer, LogCapture, LogConfig};
//! use tracing_subscriber::prelude::*;
//!
//! let capture = LogCapture::new();
//! let layer = LineLayer::capturing(capture.clone()).with_config(LogConfig::bare());
//! let subscriber = tracing_subscriber::registry().with(layer);
//!
//! tracing::subscriber::with_default(subscriber, || {
//!     tracing::info!(field = "email", "validation applied");
//! });
//!
//! assert_eq!(capture.lines(), vec!["validation applied".to_string()]);
//! ```

use std::fmt::{self, Write as FmtWrite};
use std::io::Write as IoWrite;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::prelude::*;

// ============================================================================
// Configuration
// ============================================================================

/// What each formatted line contains.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Show a `HH:MM:SS` wall-clock timestamp. Default: true.
    pub show_time: bool,
    /// Show the log level. Default: true.
    pub show_level: bool,
    /// Show the tracing target (module path). Default: true.
    pub show_target: bool,
    /// Show structured fields beyond `message`. Default: true.
    pub show_fields: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            show_time: true,
            show_level: true,
            show_target: true,
            show_fields: true,
        }
    }
}

impl LogConfig {
    /// Message only. Deterministic, for tests.
    #[must_use]
    pub fn bare() -> Self {
        Self {
            show_time: false,
            show_level: false,
            show_target: false,
            show_fields: false,
        }
    }
}

/// Format level as a fixed-width string.
fn level_str(level: Level) -> &'static str {
    match level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARN ",
        Level::INFO => "INFO ",
        Level::DEBUG => "DEBUG",
        Level::TRACE => "TRACE",
    }
}

// ============================================================================
// Event Visitor
// ============================================================================

/// Extracts message and structured fields from a tracing event.
#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    fields: Vec<(String, String)>,
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let rendered = format!("{value:?}");
        let rendered = strip_debug_quotes(&rendered);
        if field.name() == "message" {
            self.message = Some(rendered);
        } else {
            self.fields.push((field.name().to_string(), rendered));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields
                .push((field.name().to_string(), value.to_string()));
        }
    }
}

/// Remove surrounding quotes from Debug-formatted strings.
fn strip_debug_quotes(s: &str) -> String {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

/// Simple HH:MM:SS timestamp.
fn timestamp_now() -> String {
    let now = web_time::SystemTime::now();
    let since_epoch = now.duration_since(web_time::UNIX_EPOCH).unwrap_or_default();
    let secs = since_epoch.as_secs();
    let h = (secs / 3600) % 24;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

// ============================================================================
// Sinks
// ============================================================================

/// One formatted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Event level.
    pub level: Level,
    /// Event target.
    pub target: String,
    /// The formatted line.
    pub line: String,
}

/// Shared in-memory record buffer.
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl LogCapture {
    /// Create an empty capture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, record: LogRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    /// Snapshot of every captured record.
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Snapshot of the formatted lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.line).collect()
    }

    /// Number of records at `level` or more severe.
    #[must_use]
    pub fn count_at_least(&self, level: Level) -> usize {
        // tracing orders levels by verbosity: ERROR < WARN < ... < TRACE.
        self.records().iter().filter(|r| r.level <= level).count()
    }

    /// Drop every captured record.
    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Where formatted lines go.
#[derive(Debug, Clone)]
pub enum LogSink {
    /// Write each line to standard error.
    Stderr,
    /// Keep each record in memory.
    Capture(LogCapture),
}

impl LogSink {
    fn write(&self, record: LogRecord) {
        match self {
            Self::Stderr => {
                let mut stderr = std::io::stderr().lock();
                let _ = writeln!(stderr, "{}", record.line);
            }
            Self::Capture(capture) => capture.push(record),
        }
    }
}

// ============================================================================
// LineLayer
// ============================================================================

/// A `tracing_subscriber::Layer` that writes one line per event.
#[derive(Debug, Clone)]
pub struct LineLayer {
    sink: LogSink,
    config: LogConfig,
}

impl LineLayer {
    /// Layer writing to standard error.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            sink: LogSink::Stderr,
            config: LogConfig::default(),
        }
    }

    /// Layer writing into `capture`.
    #[must_use]
    pub fn capturing(capture: LogCapture) -> Self {
        Self {
            sink: LogSink::Capture(capture),
            config: LogConfig::default(),
        }
    }

    /// Replace the line configuration.
    #[must_use]
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    fn format_event(&self, event: &Event<'_>) -> LogRecord {
        let metadata = event.metadata();
        let level = *metadata.level();

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let mut line = String::new();
        if self.config.show_time {
            let _ = write!(line, "{} ", timestamp_now());
        }
        if self.config.show_level {
            let _ = write!(line, "{} ", level_str(level));
        }
        if self.config.show_target {
            let _ = write!(line, "{}: ", metadata.target());
        }
        line.push_str(&visitor.message.unwrap_or_default());
        if self.config.show_fields && !visitor.fields.is_empty() {
            for (k, v) in &visitor.fields {
                let _ = write!(line, " {k}={v}");
            }
        }

        LogRecord {
            level,
            target: metadata.target().to_string(),
            line,
        }
    }
}

impl<S> Layer<S> for LineLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.sink.write(self.format_event(event));
    }
}

/// Error returned when a global subscriber is already installed.
#[derive(Debug)]
pub struct LoggingInitError(String);

impl fmt::Display for LoggingInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to install log subscriber: {}", self.0)
    }
}

impl std::error::Error for LoggingInitError {}

/// Install a global subscriber writing lines to standard error.
///
/// `default_filter` applies when `RUST_LOG` is unset or invalid.
pub fn init(default_filter: &str) -> Result<(), LoggingInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(LineLayer::stderr())
        .try_init()
        .map_err(|err| LoggingInitError(err.to_string()))
}

// ============================================================================
// Tests
// ============================================================================
