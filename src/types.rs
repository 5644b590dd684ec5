//! Type definitions and aliases

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Transport used to deliver each request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// HTTP or HTTPS request/response
    Http,
    /// Raw bytes over a pooled TCP connection
    Tcp,
    /// One datagram out, one datagram back
    Udp,
}

impl Protocol {
    /// Lowercase name used in flags, environment variables and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }

    /// Whether the transport needs an explicit destination port
    pub fn requires_port(&self) -> bool {
        matches!(self, Protocol::Tcp | Protocol::Udp)
    }
}

impl Default for Protocol {
    fn default() -> Self {
        Protocol::Http
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

impl FromStr for Protocol {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "http" | "https" => Ok(Protocol::Http),
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            other => Err(AppError::config(format!(
                "Unsupported protocol '{}' (expected http, tcp or udp)",
                other
            ))),
        }
    }
}

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable tables
    Text,
    /// Machine-readable JSON document
    Json,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Text
    }
}

/// Coarse classification of an HTTP status code, used for report coloring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 1xx and 2xx
    Success,
    /// 3xx
    Redirect,
    /// 4xx
    ClientError,
    /// 5xx
    ServerError,
    /// 0 (no HTTP status) or anything outside 100..600
    Other,
}

impl StatusClass {
    /// Classify a raw status code
    pub fn from_code(code: u16) -> Self {
        match code {
            100..=299 => StatusClass::Success,
            300..=399 => StatusClass::Redirect,
            400..=499 => StatusClass::ClientError,
            500..=599 => StatusClass::ServerError,
            _ => StatusClass::Other,
        }
    }
}
