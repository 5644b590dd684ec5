//! Per-request outcome data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result of one request attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestOutcome {
    /// Whether the request met its protocol's success criterion
    pub success: bool,

    /// HTTP status code; 0 for TCP/UDP and for failures before a response
    pub status_code: u16,

    /// Elapsed time of the network operation in milliseconds
    pub response_time_ms: f64,

    /// Bytes received
    pub content_length: u64,

    /// Failure description, empty on success
    pub error_message: String,

    /// True only when the request missed its deadline
    pub is_timeout: bool,

    /// When the outcome was recorded
    pub timestamp: DateTime<Utc>,
}

impl RequestOutcome {
    /// Create a successful outcome
    pub fn success(status_code: u16, response_time_ms: f64, content_length: u64) -> Self {
        Self {
            success: true,
            status_code,
            response_time_ms,
            content_length,
            error_message: String::new(),
            is_timeout: false,
            timestamp: Utc::now(),
        }
    }

    /// Create an outcome from a received HTTP response
    ///
    /// Statuses in `[200, 400)` succeed; anything else fails with the
    /// status preserved and an `HTTP {code} {reason}` message.
    pub fn from_http_status(
        status_code: u16,
        reason: &str,
        response_time_ms: f64,
        content_length: u64,
    ) -> Self {
        if (200..400).contains(&status_code) {
            return Self::success(status_code, response_time_ms, content_length);
        }

        let error_message = if reason.is_empty() {
            format!("HTTP {}", status_code)
        } else {
            format!("HTTP {} {}", status_code, reason)
        };

        Self {
            success: false,
            status_code,
            response_time_ms,
            content_length,
            error_message,
            is_timeout: false,
            timestamp: Utc::now(),
        }
    }

    /// Create a failed outcome for a transport or protocol error
    pub fn failed<S: Into<String>>(error_message: S, response_time_ms: f64) -> Self {
        Self {
            success: false,
            status_code: 0,
            response_time_ms,
            content_length: 0,
            error_message: error_message.into(),
            is_timeout: false,
            timestamp: Utc::now(),
        }
    }

    /// Create an outcome for a request that missed its deadline
    pub fn timeout(timeout: Duration, response_time_ms: f64) -> Self {
        Self {
            success: false,
            status_code: 0,
            response_time_ms,
            content_length: 0,
            error_message: format!("Request timed out after {}ms", timeout.as_millis()),
            is_timeout: true,
            timestamp: Utc::now(),
        }
    }

    /// Response time as a `Duration`
    pub fn response_time(&self) -> Duration {
        Duration::from_secs_f64(self.response_time_ms.max(0.0) / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_outcome() {
        let outcome = RequestOutcome::success(0, 12.5, 64);
        assert!(outcome.success);
        assert!(!outcome.is_timeout);
        assert!(outcome.error_message.is_empty());
        assert_eq!(outcome.content_length, 64);
    }

    #[test]
    fn test_http_status_classification() {
        assert!(RequestOutcome::from_http_status(200, "OK", 1.0, 2).success);
        assert!(RequestOutcome::from_http_status(302, "Found", 1.0, 0).success);

        let not_found = RequestOutcome::from_http_status(404, "Not Found", 3.0, 9);
        assert!(!not_found.success);
        assert!(!not_found.is_timeout);
        assert_eq!(not_found.status_code, 404);
        assert_eq!(not_found.error_message, "HTTP 404 Not Found");

        let informational = RequestOutcome::from_http_status(101, "", 1.0, 0);
        assert!(!informational.success);
        assert_eq!(informational.error_message, "HTTP 101");
    }

    #[test]
    fn test_timeout_outcome() {
        let outcome = RequestOutcome::timeout(Duration::from_millis(250), 250.3);
        assert!(!outcome.success);
        assert!(outcome.is_timeout);
        assert_eq!(outcome.status_code, 0);
        assert_eq!(outcome.error_message, "Request timed out after 250ms");
        assert_eq!(outcome.response_time().as_millis(), 250);
    }

    #[test]
    fn test_failed_outcome() {
        let outcome = RequestOutcome::failed("Connection refused", 0.4);
        assert!(!outcome.success);
        assert!(!outcome.is_timeout);
        assert_eq!(outcome.status_code, 0);
        assert_eq!(outcome.error_message, "Connection refused");
    }
}
