//! Load test configuration data model and validation

use crate::defaults;
use crate::types::{AppError, OutputFormat, Protocol, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Everything one run needs; immutable once dispatch starts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestConfiguration {
    /// Target URL (HTTP) or host (TCP/UDP)
    #[serde(default)]
    pub target: String,

    /// Destination port for TCP/UDP; ignored for HTTP
    #[serde(default)]
    pub port: u16,

    /// Transport used for every request
    #[serde(default)]
    pub protocol: Protocol,

    /// HTTP method
    #[serde(default = "default_method")]
    pub method: String,

    /// Request headers (HTTP only)
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Request payload; sent raw over TCP/UDP and as JSON over HTTP
    #[serde(default)]
    pub body: Option<String>,

    /// Total number of requests to issue
    #[serde(default = "default_request_count")]
    pub number_of_requests: u64,

    /// Maximum number of requests in flight
    #[serde(default = "default_concurrency")]
    pub concurrency: u64,

    /// Per-request deadline in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Pause after each completed request before its slot is reused
    #[serde(default)]
    pub delay_ms: u64,

    /// Log every request outcome
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Render the live progress line
    #[serde(default = "default_show_progress")]
    pub show_progress: bool,

    /// Report format
    #[serde(default)]
    pub output_format: OutputFormat,
}

impl Default for TestConfiguration {
    fn default() -> Self {
        Self {
            target: String::new(),
            port: 0,
            protocol: Protocol::Http,
            method: default_method(),
            headers: HashMap::new(),
            body: None,
            number_of_requests: default_request_count(),
            concurrency: default_concurrency(),
            timeout_ms: default_timeout_ms(),
            delay_ms: 0,
            verbose: false,
            debug: false,
            enable_color: default_enable_color(),
            show_progress: default_show_progress(),
            output_format: OutputFormat::Text,
        }
    }
}

impl TestConfiguration {
    /// Create a configuration for the given target and protocol with defaults elsewhere
    pub fn new<S: Into<String>>(target: S, protocol: Protocol) -> Self {
        Self {
            target: target.into(),
            protocol,
            ..Self::default()
        }
    }

    /// Per-request deadline
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Inter-request delay, `None` when disabled
    pub fn delay(&self) -> Option<Duration> {
        (self.delay_ms > 0).then(|| Duration::from_millis(self.delay_ms))
    }

    /// Concurrency actually used: never more than the request count, never zero
    pub fn effective_concurrency(&self) -> usize {
        let limit = self.concurrency.min(self.number_of_requests.max(1)).max(1);
        usize::try_from(limit).unwrap_or(usize::MAX)
    }

    /// Host part of the target for socket transports
    ///
    /// A target written as a URL (`tcp://db.internal:5432`) yields its host;
    /// anything else is used verbatim.
    pub fn host(&self) -> String {
        let trimmed = self.target.trim();
        if trimmed.contains("://") {
            if let Ok(parsed) = url::Url::parse(trimmed) {
                if let Some(host) = parsed.host_str() {
                    return host.trim_start_matches('[').trim_end_matches(']').to_string();
                }
            }
        }
        trimmed.to_string()
    }

    /// Pool key for the TCP/UDP destination
    pub fn destination_key(&self) -> String {
        destination_key(&self.host(), self.port)
    }

    /// Body bytes when a non-empty body is configured
    pub fn body_bytes(&self) -> Option<&[u8]> {
        self.body.as_deref().filter(|b| !b.is_empty()).map(str::as_bytes)
    }

    /// Whether the HTTP method carries a body
    pub fn method_allows_body(&self) -> bool {
        matches!(self.method.to_uppercase().as_str(), "POST" | "PUT" | "PATCH")
    }

    /// Validate the configuration and return the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.target.trim().is_empty() {
            return Err(AppError::config("Target cannot be empty"));
        }

        match self.protocol {
            Protocol::Http => {
                let parsed = url::Url::parse(self.target.trim())
                    .map_err(|e| AppError::config(format!("Invalid target URL '{}': {}", self.target, e)))?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(AppError::config(format!(
                        "HTTP target must use http:// or https://, got '{}'",
                        self.target
                    )));
                }
                if reqwest::Method::from_bytes(self.method.to_uppercase().as_bytes()).is_err() {
                    return Err(AppError::config(format!("Invalid HTTP method: {}", self.method)));
                }
            }
            Protocol::Tcp | Protocol::Udp => {
                if self.port == 0 {
                    return Err(AppError::config(format!(
                        "{} target requires a port greater than 0",
                        self.protocol
                    )));
                }
                if self.host().is_empty() {
                    return Err(AppError::config(format!("Target '{}' has no host", self.target)));
                }
            }
        }

        for name in self.headers.keys() {
            if name.trim().is_empty() {
                return Err(AppError::config("Header names cannot be empty"));
            }
        }

        if self.concurrency == 0 {
            return Err(AppError::config("Concurrency must be at least 1"));
        }

        if self.timeout_ms == 0 {
            return Err(AppError::config("Timeout must be greater than 0"));
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(target) = std::env::var("TARGET_URL") {
            if !target.trim().is_empty() {
                self.target = target.trim().to_string();
            }
        }

        if let Ok(protocol) = std::env::var("PROTOCOL") {
            self.protocol = protocol.parse()?;
        }

        if let Ok(port) = std::env::var("PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid PORT value '{}': {}", port, e)))?;
        }

        if let Ok(method) = std::env::var("HTTP_METHOD") {
            self.method = method.trim().to_uppercase();
        }

        if let Ok(count) = std::env::var("REQUEST_COUNT") {
            self.number_of_requests = count
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid REQUEST_COUNT value '{}': {}", count, e)))?;
        }

        if let Ok(concurrency) = std::env::var("CONCURRENCY") {
            self.concurrency = concurrency
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid CONCURRENCY value '{}': {}", concurrency, e)))?;
        }

        if let Ok(timeout) = std::env::var("TIMEOUT_MS") {
            self.timeout_ms = timeout
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid TIMEOUT_MS value '{}': {}", timeout, e)))?;
        }

        if let Ok(delay) = std::env::var("DELAY_MS") {
            self.delay_ms = delay
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid DELAY_MS value '{}': {}", delay, e)))?;
        }

        if let Ok(body) = std::env::var("REQUEST_BODY") {
            self.body = Some(body);
        }

        if let Ok(headers) = std::env::var("REQUEST_HEADERS") {
            for pair in headers.split(';').filter(|p| !p.trim().is_empty()) {
                let (name, value) = parse_header(pair)?;
                self.headers.insert(name, value);
            }
        }

        if let Ok(enable_color) = std::env::var("ENABLE_COLOR") {
            self.enable_color = enable_color
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        Ok(())
    }
}

/// Build the `"{host}:{port}"` pool key
pub fn destination_key(host: &str, port: u16) -> String {
    format!("{}:{}", host, port)
}

/// Parse a `Name: value` header line
pub fn parse_header(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| AppError::config(format!("Header '{}' must look like 'Name: value'", raw.trim())))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::config(format!("Header '{}' has an empty name", raw.trim())));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn default_method() -> String {
    defaults::DEFAULT_METHOD.to_string()
}

fn default_request_count() -> u64 {
    defaults::DEFAULT_REQUEST_COUNT
}

fn default_concurrency() -> u64 {
    defaults::DEFAULT_CONCURRENCY
}

fn default_timeout_ms() -> u64 {
    defaults::DEFAULT_TIMEOUT.as_millis() as u64
}

fn default_enable_color() -> bool {
    defaults::DEFAULT_ENABLE_COLOR
}

fn default_show_progress() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tcp_config() -> TestConfiguration {
        TestConfiguration {
            port: 9000,
            ..TestConfiguration::new("127.0.0.1", Protocol::Tcp)
        }
    }

    #[test]
    fn test_defaults() {
        let config = TestConfiguration::default();
        assert_eq!(config.method, "GET");
        assert_eq!(config.number_of_requests, defaults::DEFAULT_REQUEST_COUNT);
        assert_eq!(config.concurrency, defaults::DEFAULT_CONCURRENCY);
        assert_eq!(config.timeout(), defaults::DEFAULT_TIMEOUT);
        assert!(config.delay().is_none());
        assert!(config.validate().is_err(), "empty target must be rejected");
    }

    #[test]
    fn test_effective_concurrency_is_clamped() {
        let mut config = TestConfiguration::new("http://localhost", Protocol::Http);
        config.number_of_requests = 5;
        config.concurrency = 50;
        assert_eq!(config.effective_concurrency(), 5);

        config.concurrency = 2;
        assert_eq!(config.effective_concurrency(), 2);

        config.number_of_requests = 0;
        assert_eq!(config.effective_concurrency(), 1);
    }

    #[test]
    fn test_http_validation() {
        let mut config = TestConfiguration::new("https://example.com/api", Protocol::Http);
        assert!(config.validate().is_ok());

        config.method = "NOT A METHOD".to_string();
        assert!(config.validate().is_err());

        config.method = "post".to_string();
        assert!(config.validate().is_ok());
        assert!(config.method_allows_body());

        config.target = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_socket_validation_requires_port() {
        let mut config = tcp_config();
        assert!(config.validate().is_ok());

        config.port = 0;
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("port"));

        let mut config = tcp_config();
        config.protocol = Protocol::Udp;
        config.concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = tcp_config();
        config.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_host_extraction() {
        let mut config = tcp_config();
        assert_eq!(config.host(), "127.0.0.1");
        assert_eq!(config.destination_key(), "127.0.0.1:9000");

        config.target = "tcp://db.internal:5432".to_string();
        assert_eq!(config.host(), "db.internal");

        config.target = "  echo.local ".to_string();
        assert_eq!(config.host(), "echo.local");
    }

    #[test]
    fn test_body_bytes() {
        let mut config = tcp_config();
        assert!(config.body_bytes().is_none());

        config.body = Some(String::new());
        assert!(config.body_bytes().is_none());

        config.body = Some("ping".to_string());
        assert_eq!(config.body_bytes(), Some(&b"ping"[..]));
    }

    #[test]
    fn test_parse_header() {
        let (name, value) = parse_header("Authorization: Bearer a:b").unwrap();
        assert_eq!(name, "Authorization");
        assert_eq!(value, "Bearer a:b");

        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn test_serde_defaults_fill_missing_fields() {
        let config: TestConfiguration =
            serde_json::from_str(r#"{"target":"10.0.0.1","protocol":"Udp","port":53}"#).unwrap();
        assert_eq!(config.protocol, Protocol::Udp);
        assert_eq!(config.method, "GET");
        assert_eq!(config.concurrency, defaults::DEFAULT_CONCURRENCY);
        assert!(config.validate().is_ok());
    }
}
