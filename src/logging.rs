//! Structured logging for load test runs
//!
//! This module provides:
//! - Leveled log entries with structured fields and a session id
//! - Console, JSON and compact output formats
//! - Per-request outcome logging for verbose runs
//! - Run lifecycle events (start, pool summary, completion, failures)
//!
//! Every entry is written to stderr so stdout carries only the report.

use crate::error::{AppError, Result};
use crate::models::{RequestOutcome, TestConfiguration};
use crate::pool::PoolStats;
use crate::stats::AggregateStatistics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Trace level - most detailed
    Trace = 0,
    /// Debug level - detailed information for debugging
    Debug = 1,
    /// Info level - general run information
    Info = 2,
    /// Warning level - suspicious but non-fatal situations
    Warn = 3,
    /// Error level - the run could not complete
    Error = 4,
}

impl LogLevel {
    /// Get log level name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    /// Get ANSI color code for console output
    pub fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Trace => "\x1b[37m",
            LogLevel::Debug => "\x1b[36m",
            LogLevel::Info => "\x1b[32m",
            LogLevel::Warn => "\x1b[33m",
            LogLevel::Error => "\x1b[31m",
        }
    }

    /// Reset ANSI color code
    pub fn reset_code() -> &'static str {
        "\x1b[0m"
    }

    /// Minimum level implied by the run flags
    pub fn for_config(config: &TestConfiguration) -> Self {
        if config.debug {
            LogLevel::Debug
        } else if config.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            _ => Err(AppError::parse(format!("Invalid log level: {}", s))),
        }
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Logger name/component
    pub logger: String,
    /// Correlation ID for tracking related events
    pub correlation_id: Option<String>,
    /// Structured fields, sorted by key
    pub fields: BTreeMap<String, serde_json::Value>,
    pub location: Option<LogLocation>,
}

/// Source code location information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLocation {
    pub file: String,
    pub line: u32,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// JSON format for structured logging
    Json,
    /// Compact single-line format
    Compact,
}

/// Destination for formatted log lines
#[derive(Debug, Clone)]
pub enum LogSink {
    Stderr,
    /// Keeps lines in memory; used to capture output in tests
    Memory(Arc<Mutex<Vec<String>>>),
}

impl LogSink {
    /// Create an in-memory sink and return it with its shared buffer
    pub fn memory() -> (Self, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        (LogSink::Memory(Arc::clone(&lines)), lines)
    }

    fn write_line(&self, line: &str) {
        match self {
            LogSink::Stderr => {
                let _ = writeln!(io::stderr(), "{}", line);
            }
            LogSink::Memory(lines) => {
                lines
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push(line.to_string());
            }
        }
    }
}

/// Session-wide fields merged into every entry
#[derive(Debug, Default)]
struct LogContext {
    session_id: Option<String>,
    context_fields: BTreeMap<String, serde_json::Value>,
}

/// Logger implementation with multiple output formats
#[derive(Clone)]
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    include_location: bool,
    format: LogFormat,
    name: String,
    sink: LogSink,
    context: Arc<RwLock<LogContext>>,
}

impl Logger {
    /// Create a logger at Info level writing console lines to stderr
    pub fn new(name: &str) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color: true,
            include_location: false,
            format: LogFormat::Console,
            name: name.to_string(),
            sink: LogSink::Stderr,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Create a logger whose level and format follow the run flags
    pub fn with_config(name: &str, config: &TestConfiguration) -> Self {
        Self {
            min_level: LogLevel::for_config(config),
            use_color: config.enable_color,
            include_location: config.debug,
            format: if config.debug { LogFormat::Json } else { LogFormat::Console },
            ..Self::new(name)
        }
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    pub fn set_format(&mut self, format: LogFormat) {
        self.format = format;
    }

    pub fn set_color(&mut self, use_color: bool) {
        self.use_color = use_color;
    }

    pub fn set_sink(&mut self, sink: LogSink) {
        self.sink = sink;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set session correlation ID
    pub async fn set_session_id(&self, session_id: String) {
        self.context.write().await.session_id = Some(session_id);
    }

    /// Add context field for all subsequent log entries
    pub async fn add_context_field<T: Serialize>(&self, key: &str, value: T) {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.context
                .write()
                .await
                .context_fields
                .insert(key.to_string(), json_value);
        }
    }

    /// Create a log entry builder
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    pub fn trace(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Trace, message)
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    /// Check if a log level would be output
    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    async fn write_entry(&self, mut entry: LogEntry) {
        if !self.would_log(entry.level) {
            return;
        }

        {
            let context = self.context.read().await;
            if let Some(session_id) = &context.session_id {
                entry.fields.insert(
                    "session_id".to_string(),
                    serde_json::Value::String(session_id.clone()),
                );
            }
            for (key, value) in &context.context_fields {
                entry.fields.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }

        let output = match self.format {
            LogFormat::Console => self.format_console(&entry),
            LogFormat::Json => self.format_json(&entry),
            LogFormat::Compact => self.format_compact(&entry),
        };

        self.sink.write_line(&output);
    }

    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level_str = entry.level.as_str();

        let formatted_level = if self.use_color {
            format!("{}{:>5}{}", entry.level.color_code(), level_str, LogLevel::reset_code())
        } else {
            format!("{:>5}", level_str)
        };

        let mut output = format!("{} {} [{}] {}", timestamp, formatted_level, entry.logger, entry.message);

        if let Some(correlation_id) = &entry.correlation_id {
            let short: String = correlation_id.chars().take(8).collect();
            output.push_str(&format!(" [{}]", short));
        }

        // The session id is noise on a terminal; keep it for JSON output
        let fields: Vec<String> = entry
            .fields
            .iter()
            .filter(|(k, _)| k.as_str() != "session_id")
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        if !fields.is_empty() {
            output.push_str(&format!(" {{{}}}", fields.join(", ")));
        }

        if self.include_location {
            if let Some(location) = &entry.location {
                output.push_str(&format!(" @ {}:{}", location.file, location.line));
            }
        }

        output
    }

    fn format_json(&self, entry: &LogEntry) -> String {
        serde_json::to_string(entry).unwrap_or_else(|_| {
            serde_json::json!({
                "error": "Failed to serialize log entry",
                "message": entry.message,
            })
            .to_string()
        })
    }

    fn format_compact(&self, entry: &LogEntry) -> String {
        format!(
            "{} {} {}: {}",
            entry.timestamp.format("%H:%M:%S"),
            entry.level.as_str().chars().next().unwrap_or('?'),
            entry.logger,
            entry.message
        )
    }
}

/// Builder pattern for creating log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                correlation_id: None,
                fields: BTreeMap::new(),
                location: None,
            },
        }
    }

    pub fn correlation_id(mut self, id: &str) -> Self {
        self.entry.correlation_id = Some(id.to_string());
        self
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    pub fn location(mut self, file: &str, line: u32) -> Self {
        self.entry.location = Some(LogLocation {
            file: file.to_string(),
            line,
        });
        self
    }

    /// Add the fields of a request outcome
    pub fn outcome(self, outcome: &RequestOutcome) -> Self {
        let builder = self
            .field("success", outcome.success)
            .field("response_time_ms", outcome.response_time_ms)
            .field("content_length", outcome.content_length)
            .field("timeout", outcome.is_timeout);

        let builder = if outcome.status_code != 0 {
            builder.field("status_code", outcome.status_code)
        } else {
            builder
        };

        if outcome.error_message.is_empty() {
            builder
        } else {
            builder.field("error", &outcome.error_message)
        }
    }

    /// Add error information
    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_exit_code", error.exit_code())
    }

    /// Finalize and write the log entry
    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }
}

/// Logs one line per completed request
#[derive(Clone)]
pub struct RequestLogger {
    logger: Logger,
}

impl RequestLogger {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// Whether per-request lines would be emitted at all
    pub fn enabled(&self) -> bool {
        self.logger.would_log(LogLevel::Info)
    }

    /// Log the outcome of request number `index` (1-based)
    pub async fn log_outcome(&self, index: u64, outcome: &RequestOutcome) {
        if !self.enabled() {
            return;
        }

        let message = if outcome.success {
            format!("Request #{} succeeded in {:.2}ms", index, outcome.response_time_ms)
        } else if outcome.is_timeout {
            format!("Request #{} timed out after {:.2}ms", index, outcome.response_time_ms)
        } else {
            format!(
                "Request #{} failed in {:.2}ms: {}",
                index, outcome.response_time_ms, outcome.error_message
            )
        };

        self.logger
            .info(&message)
            .field("request", index)
            .outcome(outcome)
            .log()
            .await;
    }

    /// Log connection pool activity for a destination
    pub async fn log_pool_stats(&self, destination: &str, stats: &PoolStats) {
        let level = if stats.replaced > 0 { LogLevel::Warn } else { LogLevel::Debug };
        self.logger
            .log(
                level,
                &format!(
                    "Connection pool for {}: {} opened, {} replaced, {} reused",
                    destination, stats.opened, stats.replaced, stats.reused
                ),
            )
            .field("destination", destination)
            .field("opened", stats.opened)
            .field("replaced", stats.replaced)
            .field("reused", stats.reused)
            .field("live", stats.live)
            .log()
            .await;
    }
}

/// Logs run lifecycle events under one correlation id
#[derive(Clone)]
pub struct RunLogger {
    logger: Logger,
    run_id: String,
}

impl RunLogger {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            run_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub async fn run_started(&self, config: &TestConfiguration) {
        self.logger
            .info(&format!(
                "Starting {} load test against {}",
                config.protocol, config.target
            ))
            .correlation_id(&self.run_id)
            .field("protocol", config.protocol.as_str())
            .field("target", &config.target)
            .field("requests", config.number_of_requests)
            .field("concurrency", config.effective_concurrency())
            .field("timeout_ms", config.timeout_ms)
            .field("delay_ms", config.delay_ms)
            .log()
            .await;
    }

    pub async fn config_warning(&self, warning: &str) {
        self.logger
            .warn(warning)
            .correlation_id(&self.run_id)
            .log()
            .await;
    }

    pub async fn run_completed(&self, stats: &AggregateStatistics, elapsed: Duration) {
        let level = if stats.total_requests > 0 && stats.successful_requests == 0 {
            LogLevel::Warn
        } else {
            LogLevel::Info
        };

        self.logger
            .log(
                level,
                &format!(
                    "Completed {} requests in {:.3}s ({:.1}% success)",
                    stats.total_requests,
                    elapsed.as_secs_f64(),
                    stats.success_rate
                ),
            )
            .correlation_id(&self.run_id)
            .field("total", stats.total_requests)
            .field("successful", stats.successful_requests)
            .field("failed", stats.failed_requests)
            .field("timeouts", stats.timeout_requests)
            .field("requests_per_second", stats.requests_per_second)
            .field("p99_ms", stats.p99_response_time)
            .log()
            .await;
    }

    pub async fn run_failed(&self, error: &AppError) {
        self.logger
            .error(&format!("Load test aborted: {}", error))
            .correlation_id(&self.run_id)
            .error_info(error)
            .log()
            .await;
    }
}

/// Creates loggers sharing one session id
pub struct LoggerFactory {
    config: TestConfiguration,
    session_id: String,
    sink: LogSink,
}

impl LoggerFactory {
    pub fn new(config: &TestConfiguration) -> Self {
        Self {
            config: config.clone(),
            session_id: Uuid::new_v4().to_string(),
            sink: LogSink::Stderr,
        }
    }

    /// Route every logger created by this factory to `sink`
    pub fn with_sink(mut self, sink: LogSink) -> Self {
        self.sink = sink;
        self
    }

    /// Create a logger with a specific name
    pub async fn create_logger(&self, name: &str) -> Logger {
        let mut logger = Logger::with_config(name, &self.config);
        logger.set_sink(self.sink.clone());
        logger.set_session_id(self.session_id.clone()).await;
        logger
    }

    pub async fn create_request_logger(&self) -> RequestLogger {
        RequestLogger::new(self.create_logger("REQ").await)
    }

    pub async fn create_run_logger(&self) -> RunLogger {
        RunLogger::new(self.create_logger("RUN").await)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Protocol;
    use std::str::FromStr;

    fn captured(lines: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
        lines.lock().unwrap().clone()
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("DEBUG").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("info").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warn);
        assert!(LogLevel::from_str("invalid").is_err());
    }

    #[test]
    fn test_level_from_config() {
        let mut config = TestConfiguration::new("http://localhost", Protocol::Http);
        assert_eq!(LogLevel::for_config(&config), LogLevel::Warn);

        config.verbose = true;
        assert_eq!(LogLevel::for_config(&config), LogLevel::Info);

        config.debug = true;
        assert_eq!(LogLevel::for_config(&config), LogLevel::Debug);

        let logger = Logger::with_config("TEST", &config);
        assert_eq!(logger.format, LogFormat::Json);
        assert!(logger.include_location);
    }

    #[test]
    fn test_level_filtering() {
        let (sink, lines) = LogSink::memory();
        let mut logger = Logger::new("TEST");
        logger.set_sink(sink);
        logger.set_level(LogLevel::Warn);
        logger.set_color(false);

        tokio_test::block_on(async {
            logger.trace("hidden").log().await;
            logger.info("hidden").log().await;
            logger.warn("shown").field("k", 1).log().await;
        });

        let lines = captured(&lines);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains(" WARN [TEST] shown {k=1}"));
    }

    #[tokio::test]
    async fn test_json_entry_carries_session_and_outcome() {
        let (sink, lines) = LogSink::memory();
        let mut logger = Logger::new("REQ");
        logger.set_sink(sink);
        logger.set_format(LogFormat::Json);
        logger.set_session_id("session-1".to_string()).await;
        logger.add_context_field("target", "127.0.0.1:9").await;

        let outcome = RequestOutcome::from_http_status(404, "Not Found", 5.0, 10);
        logger.info("request").outcome(&outcome).log().await;

        let lines = captured(&lines);
        let entry: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(entry["fields"]["session_id"], "session-1");
        assert_eq!(entry["fields"]["target"], "127.0.0.1:9");
        assert_eq!(entry["fields"]["status_code"], 404);
        assert_eq!(entry["fields"]["error"], "HTTP 404 Not Found");
        assert_eq!(entry["level"], "Info");
    }

    #[tokio::test]
    async fn test_request_logger_respects_verbosity() {
        let (sink, lines) = LogSink::memory();
        let mut config = TestConfiguration::new("127.0.0.1", Protocol::Tcp);
        config.enable_color = false;

        let quiet = LoggerFactory::new(&config).with_sink(sink.clone());
        let request_logger = quiet.create_request_logger().await;
        assert!(!request_logger.enabled());
        request_logger.log_outcome(1, &RequestOutcome::success(0, 1.0, 4)).await;
        assert!(captured(&lines).is_empty());

        config.verbose = true;
        let verbose = LoggerFactory::new(&config).with_sink(sink);
        let request_logger = verbose.create_request_logger().await;
        request_logger
            .log_outcome(2, &RequestOutcome::timeout(Duration::from_millis(50), 50.0))
            .await;

        let lines = captured(&lines);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("Request #2 timed out"));
    }

    #[tokio::test]
    async fn test_run_logger_events() {
        let (sink, lines) = LogSink::memory();
        let mut config = TestConfiguration::new("127.0.0.1", Protocol::Udp);
        config.port = 53;
        config.verbose = true;
        config.enable_color = false;

        let factory = LoggerFactory::new(&config).with_sink(sink);
        let run_logger = factory.create_run_logger().await;
        assert!(!run_logger.run_id().is_empty());

        run_logger.run_started(&config).await;
        run_logger.config_warning("UDP without a body sends nothing").await;
        run_logger.run_failed(&AppError::invalid_argument("bad")).await;

        let lines = captured(&lines);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("Starting UDP load test against 127.0.0.1"));
        assert!(lines[1].contains("WARN"));
        assert!(lines[2].contains("error_category"));
    }
}
