//! Configuration assembly from defaults, `.env`, environment variables and CLI flags

use crate::{
    cli::Cli,
    config::env::EnvManager,
    error::{AppError, Result},
    models::{config::parse_header, TestConfiguration},
    types::OutputFormat,
};

/// Combines CLI arguments with environment configuration
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete, validated configuration
    pub fn parse(&self) -> Result<TestConfiguration> {
        self.cli.validate().map_err(AppError::config)?;

        let mut config = TestConfiguration::default();

        EnvManager::load_env_file(self.cli.debug)?;
        config.merge_from_env()?;

        self.apply_cli_overrides(&mut config)?;

        config.validate()?;

        Ok(config)
    }

    /// Apply CLI argument overrides; only flags actually given win over the environment
    fn apply_cli_overrides(&self, config: &mut TestConfiguration) -> Result<()> {
        let cli = &self.cli;

        if let Some(target) = &cli.target {
            config.target = target.trim().to_string();
        }
        if let Some(protocol) = cli.protocol {
            config.protocol = protocol;
        }
        if let Some(port) = cli.port {
            config.port = port;
        }
        if let Some(requests) = cli.requests {
            config.number_of_requests = requests;
        }
        if let Some(concurrency) = cli.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(method) = &cli.method {
            config.method = method.trim().to_uppercase();
        }
        for header in &cli.headers {
            let (name, value) = parse_header(header)?;
            config.headers.insert(name, value);
        }
        if let Some(body) = &cli.body {
            config.body = Some(body.clone());
        }
        if let Some(timeout_ms) = cli.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if let Some(delay_ms) = cli.delay_ms {
            config.delay_ms = delay_ms;
        }
        if let Some(color) = cli.color_override() {
            config.enable_color = color;
        } else if config.enable_color {
            config.enable_color = crate::cli::supports_color();
        }

        // CLI-only switches
        config.verbose = cli.verbose;
        config.debug = cli.debug;
        config.show_progress = !cli.no_progress && !cli.json;
        if cli.json {
            config.output_format = OutputFormat::Json;
        }

        // A URL-shaped socket target can carry the port itself
        if config.port == 0 && config.protocol.requires_port() {
            if let Some(port) = url::Url::parse(&config.target).ok().and_then(|u| u.port()) {
                config.port = port;
            }
        }

        Ok(())
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<TestConfiguration> {
    ConfigParser::new(cli).parse()
}

/// Human-readable summary of the effective configuration
pub fn display_config_summary(config: &TestConfiguration) -> String {
    let mut summary = Vec::new();

    summary.push(format!("Target: {}", config.target));
    summary.push(format!("Protocol: {}", config.protocol));
    if config.protocol.requires_port() {
        summary.push(format!("Port: {}", config.port));
    } else {
        summary.push(format!("Method: {}", config.method));
    }
    summary.push(format!("Requests: {}", config.number_of_requests));
    summary.push(format!(
        "Concurrency: {} (effective {})",
        config.concurrency,
        config.effective_concurrency()
    ));
    summary.push(format!("Timeout: {}ms", config.timeout_ms));
    if config.delay_ms > 0 {
        summary.push(format!("Delay: {}ms", config.delay_ms));
    }
    if !config.headers.is_empty() {
        let mut names: Vec<&str> = config.headers.keys().map(String::as_str).collect();
        names.sort_unstable();
        summary.push(format!("Headers: {}", names.join(", ")));
    }
    if let Some(body) = config.body_bytes() {
        summary.push(format!("Body: {} bytes", body.len()));
    }

    summary.join("\n")
}
