//! Environment variable handling and .env file management

use crate::error::{AppError, ErrorContext, Result};
use crate::types::Protocol;
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists; variables already set in the process win
    pub fn load_env_file(debug: bool) -> Result<()> {
        Self::load_env_file_from(Path::new(".env"), debug)
    }

    /// Load a specific env file if it exists
    pub fn load_env_file_from(path: &Path, debug: bool) -> Result<()> {
        if path.exists() {
            dotenv::from_path(path).with_context(|| format!("Failed to load {}", path.display()))?;

            if debug {
                eprintln!("Loaded configuration from {}", path.display());
            }
        } else if debug {
            eprintln!("No {} file found, using defaults and CLI arguments", path.display());
        }

        Ok(())
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        r#"# Network Load Tester Configuration
#
# Values here are used as defaults and can be overridden by command-line
# arguments. Variables already exported in the shell take precedence.

# Target URL (HTTP) or host (TCP/UDP)
# TARGET_URL=http://localhost:8080/health

# Transport protocol: http, tcp or udp
# PROTOCOL=http

# Destination port for TCP/UDP targets
# PORT=9000

# HTTP method
# HTTP_METHOD=GET

# Total number of requests
# REQUEST_COUNT=100

# Maximum number of requests in flight
# CONCURRENCY=10

# Per-request timeout in milliseconds
# TIMEOUT_MS=30000

# Pause after each request before its slot is reused, in milliseconds
# DELAY_MS=0

# Request body (JSON over HTTP, raw bytes over TCP/UDP)
# REQUEST_BODY={"ping":true}

# Request headers, separated by ';'
# REQUEST_HEADERS=Authorization: Bearer token; X-Trace: load-test

# Enable colored output (true/false)
# ENABLE_COLOR=true

# Example: UDP echo service
# TARGET_URL=127.0.0.1
# PROTOCOL=udp
# PORT=7
# REQUEST_BODY=ping
"#
        .to_string()
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "TARGET_URL" => {
                if value.is_empty() {
                    return Err(AppError::config("TARGET_URL cannot be empty"));
                }
            }
            "PROTOCOL" => {
                value.parse::<Protocol>()?;
            }
            "PORT" => {
                let port: u16 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid PORT value '{}': {}", value, e)))?;
                if port == 0 {
                    return Err(AppError::config("PORT must be between 1 and 65535"));
                }
            }
            "HTTP_METHOD" => {
                reqwest::Method::from_bytes(value.to_uppercase().as_bytes())
                    .map_err(|_| AppError::config(format!("Invalid HTTP_METHOD value '{}'", value)))?;
            }
            "REQUEST_COUNT" | "DELAY_MS" => {
                value
                    .parse::<u64>()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
            }
            "CONCURRENCY" | "TIMEOUT_MS" => {
                let parsed: u64 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if parsed == 0 {
                    return Err(AppError::config(format!("{} must be greater than 0", key)));
                }
            }
            "REQUEST_HEADERS" => {
                for pair in value.split(';').filter(|p| !p.trim().is_empty()) {
                    crate::models::config::parse_header(pair)?;
                }
            }
            "ENABLE_COLOR" => {
                value
                    .parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", value, e)))?;
            }
            _ => {}
        }

        Ok(())
    }

    /// Supported environment variables as (name, description, example)
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("TARGET_URL", "Target URL (HTTP) or host (TCP/UDP)", "http://localhost:8080/"),
            ("PROTOCOL", "Transport protocol: http, tcp or udp", "tcp"),
            ("PORT", "Destination port for TCP/UDP (1-65535)", "9000"),
            ("HTTP_METHOD", "HTTP method", "POST"),
            ("REQUEST_COUNT", "Total number of requests", "1000"),
            ("CONCURRENCY", "Maximum requests in flight (>= 1)", "50"),
            ("TIMEOUT_MS", "Per-request timeout in milliseconds (>= 1)", "5000"),
            ("DELAY_MS", "Delay after each request in milliseconds", "10"),
            ("REQUEST_BODY", "Request payload", "{\"ping\":true}"),
            ("REQUEST_HEADERS", "Headers separated by ';'", "Accept: */*; X-Trace: 1"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::from("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<16} {}\n", var, description));
            help.push_str(&format!("  {:<16} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Vec<String> {
        Self::get_supported_env_vars()
            .into_iter()
            .filter_map(|(name, _, _)| {
                let value = std::env::var(name).ok()?;
                Self::validate_env_var(name, &value).err()
            })
            .map(|e| format!("Warning: {}", e))
            .collect()
    }
}
