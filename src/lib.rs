//! Network Load Tester
//!
//! Generates synthetic load against an HTTP, TCP or UDP endpoint with a
//! bounded number of requests in flight, then reduces every request outcome
//! into throughput, latency percentiles, a status-code histogram and the most
//! frequent errors.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod output;
pub mod pool;
pub mod stats;
pub mod types;

// Re-export commonly used types
pub use client::{ProtocolSender, RequestSender, TransportPools};
pub use error::{AppError, Result};
pub use executor::{run_load_test, DispatchCounters, DispatchResult, Dispatcher};
pub use models::{RequestOutcome, TestConfiguration};
pub use output::{ColoredFormatter, JsonFormatter, OutputFormatter, OutputFormatterFactory, PlainFormatter};
pub use stats::{AggregateStatistics, StatisticsConfig, StatisticsEngine};
pub use types::{OutputFormat, Protocol};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// Version line with the build metadata recorded by the build script
pub fn build_info() -> String {
    format!(
        "{} v{} ({}, {}, built {})",
        PKG_NAME,
        VERSION,
        option_env!("GIT_COMMIT").unwrap_or("unknown commit"),
        option_env!("TARGET_TRIPLE").unwrap_or("unknown target"),
        option_env!("BUILD_TIME").unwrap_or("unknown time")
    )
}

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_REQUEST_COUNT: u64 = 100;
    pub const DEFAULT_CONCURRENCY: u64 = 10;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_METHOD: &str = "GET";
    pub const DEFAULT_ENABLE_COLOR: bool = true;

    /// Size of every pooled read buffer
    pub const DEFAULT_BUFFER_SIZE: usize = 8192;
    /// Upper bound on idle buffers kept by the buffer pool
    pub const DEFAULT_BUFFER_RETENTION: usize = 1024;

    pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(200);
    pub const DEFAULT_PROGRESS_WIDTH: usize = 40;

    pub const DEFAULT_PERCENTILES: &[f64] = &[50.0, 90.0, 95.0, 99.0];
    pub const DEFAULT_TOP_ERRORS: usize = 3;
}
