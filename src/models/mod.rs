//! Data models for load test configuration and request outcomes

pub mod config;
pub mod outcome;

// Re-export main model types
pub use config::TestConfiguration;
pub use outcome::RequestOutcome;
