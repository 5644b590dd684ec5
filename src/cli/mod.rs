//! Command-line interface

use crate::types::Protocol;
use clap::{ArgAction, Parser};

/// Network Load Tester - generate concurrent HTTP, TCP or UDP load and report latency percentiles
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "nload")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Target URL (HTTP) or host (TCP/UDP); falls back to TARGET_URL
    #[arg(value_name = "TARGET")]
    pub target: Option<String>,

    /// Transport protocol: http, tcp or udp
    #[arg(short = 'p', long, value_parser = parse_protocol)]
    pub protocol: Option<Protocol>,

    /// Destination port for TCP/UDP targets
    #[arg(short = 'P', long)]
    pub port: Option<u16>,

    /// Total number of requests
    #[arg(short = 'n', long = "requests", value_name = "N")]
    pub requests: Option<u64>,

    /// Maximum number of requests in flight
    #[arg(short = 'c', long, value_name = "C", value_parser = parse_positive)]
    pub concurrency: Option<u64>,

    /// HTTP method
    #[arg(short = 'm', long)]
    pub method: Option<String>,

    /// Request header as "Name: value" (repeatable)
    #[arg(short = 'H', long = "header", action = ArgAction::Append, value_name = "HEADER")]
    pub headers: Vec<String>,

    /// Request body; sent as JSON over HTTP and as raw bytes over TCP/UDP
    #[arg(short = 'd', long)]
    pub body: Option<String>,

    /// Per-request timeout in milliseconds
    #[arg(short = 't', long = "timeout", value_name = "MS", value_parser = parse_positive)]
    pub timeout_ms: Option<u64>,

    /// Pause after each request before its slot is reused, in milliseconds
    #[arg(long = "delay", value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// Log every request outcome
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output (JSON log lines)
    #[arg(long)]
    pub debug: bool,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Do not render the live progress line
    #[arg(long)]
    pub no_progress: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Print an example .env file and exit
    #[arg(long)]
    pub print_env_example: bool,
}

impl Cli {
    /// Validate CLI arguments for conflicts
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        for header in &self.headers {
            if crate::models::config::parse_header(header).is_err() {
                return Err(format!("Invalid header '{}': expected 'Name: value'", header));
            }
        }

        Ok(())
    }

    /// Color preference from flags, `None` when left to the environment
    pub fn color_override(&self) -> Option<bool> {
        if self.color {
            Some(true)
        } else if self.no_color {
            Some(false)
        } else {
            None
        }
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        self.color_override().unwrap_or_else(supports_color)
    }
}

fn parse_protocol(s: &str) -> Result<Protocol, String> {
    s.parse::<Protocol>().map_err(|e| e.to_string())
}

fn parse_positive(s: &str) -> Result<u64, String> {
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid number: {}", s));
    }

    match s.parse::<u64>() {
        Ok(0) => Err("Value must be greater than 0".to_string()),
        Ok(value) => Ok(value),
        Err(_) => Err(format!("Invalid number: {}", s)),
    }
}

/// Check if the terminal supports color output
pub fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    cfg!(unix)
}
