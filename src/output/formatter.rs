//! Core formatting trait and the plain text implementation
//!
//! Tables are built from `Column` definitions and string rows; widths are
//! computed from the widest cell and clamped to each column's bounds.

use crate::{
    config::display_config_summary,
    error::{AppError, Result},
    models::TestConfiguration,
    stats::AggregateStatistics,
};
use std::fmt::Write as _;

/// Main trait for report rendering
pub trait OutputFormatter {
    /// Format a header section
    fn format_header(&self, title: &str) -> Result<String>;

    /// Format the effective configuration
    fn format_config_summary(&self, config: &TestConfiguration) -> Result<String>;

    /// Format the aggregate statistics of a run
    fn format_statistics(&self, stats: &AggregateStatistics) -> Result<String>;

    /// Format error messages
    fn format_error(&self, error: &str) -> Result<String>;

    /// Format warning messages
    fn format_warning(&self, warning: &str) -> Result<String>;

    /// Full report: header, configuration, then statistics
    fn format_report(&self, config: &TestConfiguration, stats: &AggregateStatistics) -> Result<String> {
        let mut output = String::new();
        output.push_str(&self.format_header("Load Test Results")?);
        output.push_str("\n\n");
        output.push_str(&self.format_config_summary(config)?);
        output.push_str("\n\n");
        output.push_str(&self.format_statistics(stats)?);
        Ok(output)
    }
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Show table borders
    pub table_borders: bool,
    /// Width of the status code distribution bars
    pub bar_width: usize,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            table_borders: true,
            bar_width: 30,
        }
    }
}

/// Table formatting configuration
#[derive(Debug, Clone)]
pub struct TableFormat {
    pub columns: Vec<Column>,
    pub show_borders: bool,
    pub show_header: bool,
}

/// Column definition for table formatting
#[derive(Debug, Clone)]
pub struct Column {
    pub header: String,
    pub alignment: Alignment,
    pub min_width: usize,
    pub max_width: usize,
}

impl Column {
    pub fn new(header: &str, alignment: Alignment, min_width: usize, max_width: usize) -> Self {
        Self {
            header: header.to_string(),
            alignment,
            min_width,
            max_width,
        }
    }
}

/// Text alignment options
#[derive(Debug, Clone, Copy)]
pub enum Alignment {
    Left,
    Right,
    Center,
}

/// Row data for table formatting
pub type RowData = Vec<String>;

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }

    /// Create a table with the given format and data
    pub fn create_table(&self, format: &TableFormat, rows: &[RowData]) -> String {
        if rows.is_empty() {
            return String::new();
        }

        let widths = column_widths(format, rows);
        let mut output = String::new();

        if format.show_header && !format.columns.is_empty() {
            if format.show_borders {
                output.push_str(&horizontal_border(&widths));
                output.push('\n');
            }

            let headers: Vec<String> = format.columns.iter().map(|c| c.header.clone()).collect();
            output.push_str(&create_row(&headers, &widths, format));
            output.push('\n');

            if format.show_borders {
                output.push_str(&horizontal_border(&widths));
                output.push('\n');
            }
        }

        for row in rows {
            output.push_str(&create_row(row, &widths, format));
            output.push('\n');
        }

        if format.show_borders {
            output.push_str(&horizontal_border(&widths));
        }

        output.trim_end_matches('\n').to_string()
    }

    fn latency_table(&self, stats: &AggregateStatistics) -> String {
        let format = TableFormat {
            columns: vec![
                Column::new("Metric", Alignment::Left, 8, 20),
                Column::new("Value", Alignment::Right, 10, 16),
            ],
            show_borders: self.options.table_borders,
            show_header: true,
        };

        let rows: Vec<RowData> = latency_rows(stats)
            .into_iter()
            .map(|(label, value)| vec![label, format_duration(value)])
            .collect();

        self.create_table(&format, &rows)
    }

    fn status_table(&self, stats: &AggregateStatistics) -> String {
        let format = TableFormat {
            columns: vec![
                Column::new("Status", Alignment::Left, 6, 16),
                Column::new("Count", Alignment::Right, 5, 12),
                Column::new("Share", Alignment::Right, 6, 8),
            ],
            show_borders: self.options.table_borders,
            show_header: true,
        };

        let rows: Vec<RowData> = stats
            .status_codes
            .iter()
            .map(|(&code, &count)| {
                vec![
                    status_label(code),
                    count.to_string(),
                    format_percentage(share(count, stats.total_requests)),
                ]
            })
            .collect();

        self.create_table(&format, &rows)
    }
}

impl OutputFormatter for PlainFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let border = "=".repeat(title.len() + 4);
        Ok(format!("{}\n  {}  \n{}", border, title, border))
    }

    fn format_config_summary(&self, config: &TestConfiguration) -> Result<String> {
        Ok(format!("Configuration:\n--------------\n{}", display_config_summary(config)))
    }

    fn format_statistics(&self, stats: &AggregateStatistics) -> Result<String> {
        let mut output = String::new();

        write_summary(&mut output, stats)
            .map_err(|e| AppError::io(format!("Failed to format summary: {}", e)))?;

        if stats.total_requests == 0 {
            output.push_str("\nNo requests were issued.");
            return Ok(output);
        }

        output.push_str("\nResponse Times:\n");
        output.push_str(&self.latency_table(stats));

        output.push_str("\n\nStatus Codes:\n");
        output.push_str(&self.status_table(stats));

        if !stats.top_errors.is_empty() {
            output.push_str("\n\nTop Errors:");
            for (rank, error) in stats.top_errors.iter().enumerate() {
                write!(output, "\n  {}. {} ({})", rank + 1, error.message, error.count)
                    .map_err(|e| AppError::io(format!("Failed to format errors: {}", e)))?;
            }
        }

        Ok(output)
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("Error: {}", error))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("Warning: {}", warning))
    }
}

fn write_summary(output: &mut String, stats: &AggregateStatistics) -> std::fmt::Result {
    writeln!(output, "Summary:")?;
    writeln!(output, "--------")?;
    writeln!(output, "Total Duration:   {}", format_duration(stats.total_duration.as_secs_f64() * 1000.0))?;
    writeln!(output, "Total Requests:   {}", stats.total_requests)?;
    writeln!(
        output,
        "Successful:       {} ({})",
        stats.successful_requests,
        format_percentage(stats.success_rate)
    )?;
    writeln!(output, "Failed:           {}", stats.failed_requests)?;
    writeln!(output, "Timeouts:         {}", stats.timeout_requests)?;
    writeln!(output, "Throughput:       {:.2} req/s", stats.requests_per_second)?;
    writeln!(output, "Data Received:    {}", format_bytes(stats.total_bytes))
}

/// Labelled latency figures in report order
pub(crate) fn latency_rows(stats: &AggregateStatistics) -> Vec<(String, f64)> {
    let mut rows = vec![
        ("Min".to_string(), stats.min_response_time),
        ("Avg".to_string(), stats.avg_response_time),
        ("Std Dev".to_string(), stats.std_dev_response_time),
        ("Max".to_string(), stats.max_response_time),
    ];
    rows.extend(
        stats
            .percentiles
            .iter()
            .map(|p| (format!("p{}", trim_float(p.percentile)), p.value_ms)),
    );
    rows
}

/// Display label for a status code; 0 means no HTTP response
pub(crate) fn status_label(code: u16) -> String {
    if code == 0 {
        "none".to_string()
    } else {
        code.to_string()
    }
}

pub(crate) fn share(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Format duration in human-readable format
pub fn format_duration(duration_ms: f64) -> String {
    if duration_ms < 1.0 {
        format!("{:.0}μs", duration_ms * 1000.0)
    } else if duration_ms < 1000.0 {
        format!("{:.2}ms", duration_ms)
    } else if duration_ms < 60000.0 {
        format!("{:.2}s", duration_ms / 1000.0)
    } else {
        let minutes = (duration_ms / 60000.0) as u64;
        let seconds = (duration_ms % 60000.0) / 1000.0;
        format!("{}m{:.1}s", minutes, seconds)
    }
}

/// Format percentage with appropriate precision
pub fn format_percentage(percentage: f64) -> String {
    if percentage >= 99.95 {
        "100.0%".to_string()
    } else if percentage < 0.05 {
        "0.0%".to_string()
    } else {
        format!("{:.1}%", percentage)
    }
}

/// Format a byte count with binary units
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

fn trim_float(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

fn column_widths(format: &TableFormat, rows: &[RowData]) -> Vec<usize> {
    let columns = format
        .columns
        .len()
        .max(rows.iter().map(Vec::len).max().unwrap_or(0));

    (0..columns)
        .map(|idx| {
            let column = format.columns.get(idx);
            let mut width = column.map_or(0, |c| c.min_width.max(c.header.chars().count()));
            for row in rows {
                if let Some(cell) = row.get(idx) {
                    width = width.max(cell.chars().count());
                }
            }
            column.map_or(width, |c| width.min(c.max_width.max(c.header.chars().count())))
        })
        .collect()
}

fn create_row(data: &[String], widths: &[usize], format: &TableFormat) -> String {
    let mut row = String::new();

    if format.show_borders {
        row.push('|');
    }

    for (idx, (cell, &width)) in data.iter().zip(widths).enumerate() {
        let alignment = format.columns.get(idx).map_or(Alignment::Left, |c| c.alignment);

        if format.show_borders {
            row.push(' ');
        }
        row.push_str(&align_text(cell, width, alignment));
        if format.show_borders {
            row.push_str(" |");
        } else {
            row.push_str("  ");
        }
    }

    row.trim_end().to_string()
}

fn horizontal_border(widths: &[usize]) -> String {
    let mut border = String::from("+");
    for &width in widths {
        border.push_str(&"-".repeat(width + 2));
        border.push('+');
    }
    border
}

fn align_text(text: &str, width: usize, alignment: Alignment) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.chars().take(width).collect();
    }

    let padding = width - len;
    match alignment {
        Alignment::Left => format!("{}{}", text, " ".repeat(padding)),
        Alignment::Right => format!("{}{}", " ".repeat(padding), text),
        Alignment::Center => {
            let left = padding / 2;
            format!("{}{}{}", " ".repeat(left), text, " ".repeat(padding - left))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RequestOutcome;
    use crate::stats::StatisticsEngine;
    use std::time::Duration;

    fn sample_stats() -> AggregateStatistics {
        let mut outcomes: Vec<_> = (0..8)
            .map(|i| RequestOutcome::success(200, 10.0 + i as f64, 512))
            .collect();
        outcomes.push(RequestOutcome::from_http_status(500, "Internal Server Error", 40.0, 0));
        outcomes.push(RequestOutcome::failed("Connection refused", 1.0));
        StatisticsEngine::with_defaults().compute(&outcomes, Duration::from_secs(2))
    }

    fn plain() -> PlainFormatter {
        PlainFormatter::new(FormattingOptions {
            enable_color: false,
            ..FormattingOptions::default()
        })
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_duration(0.5), "500μs");
        assert_eq!(format_duration(12.346), "12.35ms");
        assert_eq!(format_duration(1500.0), "1.50s");
        assert_eq!(format_duration(90_000.0), "1m30.0s");

        assert_eq!(format_percentage(99.99), "100.0%");
        assert_eq!(format_percentage(0.01), "0.0%");
        assert_eq!(format_percentage(42.26), "42.3%");

        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(4096), "4.0 KiB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MiB");
    }

    #[test]
    fn test_statistics_report_sections() {
        let report = plain().format_statistics(&sample_stats()).unwrap();

        assert!(report.contains("Total Requests:   10"));
        assert!(report.contains("Successful:       8 (80.0%)"));
        assert!(report.contains("Failed:           2"));
        assert!(report.contains("Throughput:       5.00 req/s"));
        assert!(report.contains("| p99"));
        assert!(report.contains("| none"));
        assert!(report.contains("| 500"));
        assert!(report.contains("1. HTTP 500 Internal Server Error (1)"));
        assert!(report.contains("Connection refused (1)"));
    }

    #[test]
    fn test_empty_run_report() {
        let stats = AggregateStatistics::empty(Duration::from_millis(3));
        let report = plain().format_statistics(&stats).unwrap();
        assert!(report.contains("Total Requests:   0"));
        assert!(report.contains("No requests were issued."));
        assert!(!report.contains("Response Times"));
    }

    #[test]
    fn test_table_alignment() {
        let format = TableFormat {
            columns: vec![
                Column::new("Name", Alignment::Left, 4, 10),
                Column::new("N", Alignment::Right, 3, 5),
            ],
            show_borders: true,
            show_header: true,
        };
        let table = plain().create_table(&format, &[vec!["a".into(), "7".into()]]);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[0], "+------+-----+");
        assert_eq!(lines[1], "| Name |   N |");
        assert_eq!(lines[3], "| a    |   7 |");
        assert!(lines.iter().all(|l| l.chars().count() == lines[0].chars().count()));
    }

    #[test]
    fn test_full_report_includes_configuration() {
        let config = TestConfiguration::new("http://localhost:8080/", crate::types::Protocol::Http);
        let report = plain().format_report(&config, &sample_stats()).unwrap();
        assert!(report.starts_with("====="));
        assert!(report.contains("Target: http://localhost:8080/"));
        assert!(report.contains("Summary:"));
    }
}
