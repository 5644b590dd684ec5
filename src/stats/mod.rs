//! Statistics engine reducing request outcomes into an aggregate report


use crate::{defaults, models::RequestOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Configuration for statistical calculations
#[derive(Debug, Clone)]
pub struct StatisticsConfig {
    /// Percentiles reported in `AggregateStatistics::percentiles`
    pub percentiles: Vec<f64>,
    /// Number of most frequent error messages kept
    pub top_errors: usize,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            percentiles: defaults::DEFAULT_PERCENTILES.to_vec(),
            top_errors: defaults::DEFAULT_TOP_ERRORS,
        }
    }
}

/// One error message and how often it occurred
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCount {
    pub message: String,
    pub count: u64,
}

/// A requested percentile and its value in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileValue {
    pub percentile: f64,
    pub value_ms: f64,
}

/// Read-only summary of a completed run
///
/// Response-time figures are in milliseconds and cover every outcome,
/// failures and timeouts included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStatistics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Subset of `failed_requests` that missed their deadline
    pub timeout_requests: u64,
    /// Percentage of successful requests
    pub success_rate: f64,
    /// Wall time of the whole run
    #[serde(with = "duration_secs")]
    pub total_duration: Duration,
    pub requests_per_second: f64,
    pub total_bytes: u64,
    pub min_response_time: f64,
    pub max_response_time: f64,
    pub avg_response_time: f64,
    pub std_dev_response_time: f64,
    pub p50_response_time: f64,
    pub p90_response_time: f64,
    pub p95_response_time: f64,
    pub p99_response_time: f64,
    pub percentiles: Vec<PercentileValue>,
    /// Status code to count, ascending by code
    pub status_codes: BTreeMap<u16, u64>,
    pub top_errors: Vec<ErrorCount>,
    pub generated_at: DateTime<Utc>,
}

impl AggregateStatistics {
    /// Statistics for a run that produced no outcomes
    pub fn empty(total_duration: Duration) -> Self {
        Self {
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            timeout_requests: 0,
            success_rate: 0.0,
            total_duration,
            requests_per_second: 0.0,
            total_bytes: 0,
            min_response_time: 0.0,
            max_response_time: 0.0,
            avg_response_time: 0.0,
            std_dev_response_time: 0.0,
            p50_response_time: 0.0,
            p90_response_time: 0.0,
            p95_response_time: 0.0,
            p99_response_time: 0.0,
            percentiles: Vec::new(),
            status_codes: BTreeMap::new(),
            top_errors: Vec::new(),
            generated_at: Utc::now(),
        }
    }

    /// Whether any request failed
    pub fn has_failures(&self) -> bool {
        self.failed_requests > 0
    }

    /// Export as pretty-printed JSON
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Reduces outcomes into `AggregateStatistics`
#[derive(Debug, Clone, Default)]
pub struct StatisticsEngine {
    config: StatisticsConfig,
}

impl StatisticsEngine {
    pub fn new(config: StatisticsConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(StatisticsConfig::default())
    }

    /// Compute the aggregate view of `outcomes` collected over `wall_time`
    pub fn compute(&self, outcomes: &[RequestOutcome], wall_time: Duration) -> AggregateStatistics {
        if outcomes.is_empty() {
            return AggregateStatistics::empty(wall_time);
        }

        let total = outcomes.len() as u64;
        let successful = outcomes.iter().filter(|o| o.success).count() as u64;
        let failed = total - successful;
        let timeouts = outcomes.iter().filter(|o| o.is_timeout).count() as u64;
        let total_bytes = outcomes.iter().map(|o| o.content_length).sum();

        let mut times: Vec<f64> = outcomes.iter().map(|o| o.response_time_ms).collect();
        times.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let avg = times.iter().sum::<f64>() / times.len() as f64;

        AggregateStatistics {
            total_requests: total,
            successful_requests: successful,
            failed_requests: failed,
            timeout_requests: timeouts,
            success_rate: successful as f64 / total as f64 * 100.0,
            total_duration: wall_time,
            requests_per_second: throughput(total, wall_time),
            total_bytes,
            min_response_time: times[0],
            max_response_time: times[times.len() - 1],
            avg_response_time: avg,
            std_dev_response_time: std_dev(&times, avg),
            p50_response_time: percentile(&times, 50.0),
            p90_response_time: percentile(&times, 90.0),
            p95_response_time: percentile(&times, 95.0),
            p99_response_time: percentile(&times, 99.0),
            percentiles: self
                .config
                .percentiles
                .iter()
                .map(|&p| PercentileValue {
                    percentile: p,
                    value_ms: percentile(&times, p),
                })
                .collect(),
            status_codes: status_histogram(outcomes),
            top_errors: top_errors(outcomes, self.config.top_errors),
            generated_at: Utc::now(),
        }
    }
}

/// Percentile of an ascending slice with linear interpolation between ranks
///
/// Returns 0 for an empty slice; `p` is clamped to `[0, 100]`.
pub fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let index = (p.clamp(0.0, 100.0) / 100.0) * (sorted_values.len() as f64 - 1.0);
    let lower_index = index.floor() as usize;
    let upper_index = index.ceil() as usize;

    if lower_index == upper_index {
        sorted_values[lower_index]
    } else {
        let lower_value = sorted_values[lower_index];
        let upper_value = sorted_values[upper_index];
        let weight = index - lower_index as f64;
        lower_value + weight * (upper_value - lower_value)
    }
}

/// Requests per second, 0 when no time elapsed
pub fn throughput(requests: u64, wall_time: Duration) -> f64 {
    let secs = wall_time.as_secs_f64();
    if secs > 0.0 {
        requests as f64 / secs
    } else {
        0.0
    }
}

/// Sample standard deviation
fn std_dev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn status_histogram(outcomes: &[RequestOutcome]) -> BTreeMap<u16, u64> {
    let mut histogram = BTreeMap::new();
    for outcome in outcomes {
        *histogram.entry(outcome.status_code).or_insert(0) += 1;
    }
    histogram
}

/// Most frequent messages among failed outcomes; ties keep first-seen order
fn top_errors(outcomes: &[RequestOutcome], limit: usize) -> Vec<ErrorCount> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    let mut first_seen: Vec<&str> = Vec::new();

    for outcome in outcomes.iter().filter(|o| !o.success && !o.error_message.is_empty()) {
        let count = counts.entry(outcome.error_message.as_str()).or_insert(0);
        if *count == 0 {
            first_seen.push(outcome.error_message.as_str());
        }
        *count += 1;
    }

    let mut ranked: Vec<ErrorCount> = first_seen
        .into_iter()
        .map(|message| ErrorCount {
            message: message.to_string(),
            count: counts[message],
        })
        .collect();

    // Stable sort keeps first-seen order among equal counts
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(limit);
    ranked
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
