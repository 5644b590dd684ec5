//! Network Load Tester - command-line entry point
//!
//! Generates concurrent HTTP, TCP or UDP load against one target and prints
//! throughput, latency percentiles and an error breakdown.

use clap::{CommandFactory, FromArgMatches};
use network_load_tester::{
    cli::Cli,
    config::{display_config_summary, load_config, validate_config, EnvManager, ValidationLevel},
    error::{ErrorReporter, Result},
    executor::run_load_test,
    logging::LoggerFactory,
    models::TestConfiguration,
    output::OutputFormatterFactory,
    build_info,
};
use std::process;

#[tokio::main]
async fn main() {
    let matches = Cli::command()
        .after_long_help(EnvManager::display_env_help())
        .get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    if cli.print_env_example {
        print!("{}", EnvManager::create_example_env_content());
        return;
    }

    let use_color = cli.use_colors();
    let verbose = cli.verbose || cli.debug;

    if let Err(message) = cli.validate() {
        eprintln!("Error: {}", message);
        process::exit(1);
    }

    if let Err(e) = run_application(cli).await {
        ErrorReporter::new(use_color, verbose).report_error(&e);
        process::exit(e.exit_code());
    }
}

/// Main application logic
async fn run_application(cli: Cli) -> Result<()> {
    if cli.debug {
        eprintln!("{}", build_info());
        eprintln!("Debug mode enabled");
        for warning in EnvManager::validate_current_env() {
            eprintln!("{}", warning);
        }
    }

    let config = load_config(cli)?;

    if config.debug {
        eprintln!("Configuration loaded:\n{}\n", display_config_summary(&config));
    }

    report_config_warnings(&config).await?;

    let stats = run_load_test(&config).await?;

    let formatter = OutputFormatterFactory::create_formatter(&config);
    println!("{}", formatter.format_report(&config, &stats)?);

    Ok(())
}

/// Log advisory warnings; informational notes only in verbose mode
async fn report_config_warnings(config: &TestConfiguration) -> Result<()> {
    let warnings = validate_config(config)?;
    if warnings.is_empty() {
        return Ok(());
    }

    let logger = LoggerFactory::new(config).create_logger("CONFIG").await;
    for warning in warnings {
        match warning.level {
            ValidationLevel::Warning => logger.warn(&warning.message).log().await,
            ValidationLevel::Info => logger.info(&warning.message).log().await,
        }
    }

    Ok(())
}
