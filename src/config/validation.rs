//! Advisory checks on an otherwise valid configuration

use crate::{
    error::Result,
    models::TestConfiguration,
    types::Protocol,
};
use colored::Colorize;

// Below this the deadline is mostly connection setup
const LOW_TIMEOUT_MS: u64 = 50;
const HIGH_DELAY_MS: u64 = 10_000;
const HIGH_CONCURRENCY: u64 = 1_000;

/// Configuration validator producing warnings that do not stop a run
pub struct ConfigValidator;

impl ConfigValidator {
    /// Run the hard validation, then collect advisory warnings
    pub fn validate_comprehensive(config: &TestConfiguration) -> Result<Vec<ValidationWarning>> {
        config.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(Self::check_target(config));
        warnings.extend(Self::check_payload(config));
        warnings.extend(Self::check_load_shape(config));
        Ok(warnings)
    }

    fn check_target(config: &TestConfiguration) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        match config.protocol {
            Protocol::Http => {
                if let Ok(parsed) = url::Url::parse(config.target.trim()) {
                    if parsed.scheme() == "https" {
                        warnings.push(ValidationWarning::new(
                            ValidationLevel::Info,
                            "HTTPS target: connection setup includes the TLS handshake",
                        ));
                    }
                    if parsed.query().is_some() {
                        warnings.push(ValidationWarning::new(
                            ValidationLevel::Info,
                            format!("Target '{}' includes query parameters, which may be cached", config.target),
                        ));
                    }
                }
                if !config.headers.is_empty() && config.headers.keys().any(|k| k.eq_ignore_ascii_case("content-type")) {
                    warnings.push(ValidationWarning::new(
                        ValidationLevel::Info,
                        "Custom Content-Type header is sent alongside the JSON body type",
                    ));
                }
            }
            Protocol::Tcp | Protocol::Udp => {
                if !config.headers.is_empty() {
                    warnings.push(ValidationWarning::new(
                        ValidationLevel::Warning,
                        format!("Headers are ignored for {} targets", config.protocol),
                    ));
                }
                if config.method != crate::defaults::DEFAULT_METHOD {
                    warnings.push(ValidationWarning::new(
                        ValidationLevel::Info,
                        format!("HTTP method {} is ignored for {} targets", config.method, config.protocol),
                    ));
                }
            }
        }

        warnings
    }

    fn check_payload(config: &TestConfiguration) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        match (config.protocol, config.body_bytes()) {
            (Protocol::Udp, None) => warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "UDP without a body sends nothing; every request will wait for its timeout unless the peer speaks first",
            )),
            (Protocol::Tcp, None) => warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "TCP without a body only waits for data from the peer",
            )),
            (Protocol::Http, Some(_)) if !config.method_allows_body() => {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!("Body is not sent with {} requests", config.method.to_uppercase()),
                ))
            }
            (Protocol::Http, Some(body)) => {
                if serde_json::from_slice::<serde_json::Value>(body).is_err() {
                    warnings.push(ValidationWarning::new(
                        ValidationLevel::Info,
                        "Body is not valid JSON but is sent as application/json",
                    ));
                }
            }
            _ => {}
        }

        warnings
    }

    fn check_load_shape(config: &TestConfiguration) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.number_of_requests == 0 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "Request count is 0; the report will be empty",
            ));
        } else if config.concurrency > config.number_of_requests {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "Concurrency {} exceeds request count {}; using {}",
                    config.concurrency,
                    config.number_of_requests,
                    config.effective_concurrency()
                ),
            ));
        }

        if config.concurrency > HIGH_CONCURRENCY {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Concurrency of {} may exhaust local file descriptors or ephemeral ports",
                    config.concurrency
                ),
            ));
        }

        if config.timeout_ms < LOW_TIMEOUT_MS {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Timeout of {}ms may be too short for reliable measurements", config.timeout_ms),
            ));
        }

        if config.delay_ms >= HIGH_DELAY_MS {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Delay of {}ms per request will make the run very slow", config.delay_ms),
            ));
        }

        warnings
    }
}

/// Validation warning levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationLevel {
    Info,
    Warning,
}

impl ValidationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    pub fn new<S: Into<String>>(level: ValidationLevel, message: S) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        let tag = format!("[{}]", self.level.as_str());
        if use_color {
            let tag = match self.level {
                ValidationLevel::Info => tag.blue(),
                ValidationLevel::Warning => tag.yellow().bold(),
            };
            format!("{} {}", tag, self.message)
        } else {
            format!("{} {}", tag, self.message)
        }
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &TestConfiguration) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}
