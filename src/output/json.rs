//! Machine-readable report

use super::formatter::OutputFormatter;
use crate::{error::Result, models::TestConfiguration, stats::AggregateStatistics};
use serde::Serialize;
use serde_json::json;

/// Renders reports as pretty-printed JSON documents
#[derive(Debug, Default)]
pub struct JsonFormatter;

#[derive(Serialize)]
struct Report<'a> {
    tool: &'static str,
    version: &'static str,
    configuration: &'a TestConfiguration,
    statistics: &'a AggregateStatistics,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_header(&self, _title: &str) -> Result<String> {
        Ok(String::new())
    }

    fn format_config_summary(&self, config: &TestConfiguration) -> Result<String> {
        Ok(serde_json::to_string_pretty(config)?)
    }

    fn format_statistics(&self, stats: &AggregateStatistics) -> Result<String> {
        stats.to_json()
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(serde_json::to_string_pretty(&json!({ "error": error }))?)
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(serde_json::to_string_pretty(&json!({ "warning": warning }))?)
    }

    /// One document holding both the configuration and the statistics
    fn format_report(&self, config: &TestConfiguration, stats: &AggregateStatistics) -> Result<String> {
        let report = Report {
            tool: crate::PKG_NAME,
            version: crate::VERSION,
            configuration: config,
            statistics: stats,
        };
        Ok(serde_json::to_string_pretty(&report)?)
    }
}
