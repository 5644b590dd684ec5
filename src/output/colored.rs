//! Colored terminal formatter
//!
//! Latency values are colored by `LatencyLevel`, status codes by their
//! `StatusClass`, and the success rate by fixed thresholds.

use super::formatter::{
    format_bytes, format_duration, format_percentage, latency_rows, share, status_label, FormattingOptions,
    OutputFormatter,
};
use crate::{
    config::display_config_summary,
    error::{AppError, Result},
    models::TestConfiguration,
    stats::AggregateStatistics,
    types::StatusClass,
};
use colored::*;
use std::fmt::Write as _;

/// Latency classification for color coding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyLevel {
    Excellent, // < 50ms
    Good,      // 50-100ms
    Fair,      // 100-300ms
    Poor,      // 300-1000ms
    VeryPoor,  // >= 1000ms
}

impl LatencyLevel {
    pub fn from_response_time(time_ms: f64) -> Self {
        if time_ms < 50.0 {
            Self::Excellent
        } else if time_ms < 100.0 {
            Self::Good
        } else if time_ms < 300.0 {
            Self::Fair
        } else if time_ms < 1000.0 {
            Self::Poor
        } else {
            Self::VeryPoor
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Excellent => Color::Green,
            Self::Good => Color::Cyan,
            Self::Fair => Color::Yellow,
            Self::Poor => Color::Magenta,
            Self::VeryPoor => Color::Red,
        }
    }
}

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub muted: Color,
    pub border: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            info: Color::Cyan,
            muted: Color::BrightBlack,
            border: Color::BrightBlack,
        }
    }
}

impl ColorScheme {
    /// Color for a status code bucket
    pub fn status_color(&self, class: StatusClass) -> Color {
        match class {
            StatusClass::Success => self.success,
            StatusClass::Redirect => self.info,
            StatusClass::ClientError => self.warning,
            StatusClass::ServerError => self.error,
            StatusClass::Other => self.muted,
        }
    }
}

/// Colored formatter implementation
pub struct ColoredFormatter {
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self::with_color_scheme(options, ColorScheme::default())
    }

    pub fn with_color_scheme(options: FormattingOptions, color_scheme: ColorScheme) -> Self {
        Self { options, color_scheme }
    }

    /// Apply color to text if colors are enabled
    fn colorize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.color(color)
        } else {
            text.normal()
        }
    }

    fn bold(&self, text: &str) -> ColoredString {
        if self.options.enable_color {
            text.bold()
        } else {
            text.normal()
        }
    }

    fn emphasize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.bold().color(color)
        } else {
            text.normal()
        }
    }

    fn section(&self, title: &str) -> String {
        self.emphasize(title, self.color_scheme.header).to_string()
    }

    fn duration_colored(&self, duration_ms: f64) -> ColoredString {
        let level = LatencyLevel::from_response_time(duration_ms);
        self.colorize(&format_duration(duration_ms), level.color())
    }

    fn percentage_colored(&self, percentage: f64) -> ColoredString {
        let color = if percentage >= 95.0 {
            self.color_scheme.success
        } else if percentage >= 80.0 {
            self.color_scheme.warning
        } else {
            self.color_scheme.error
        };
        self.colorize(&format_percentage(percentage), color)
    }

    /// Proportional bar for one status code bucket
    fn share_bar(&self, percentage: f64, color: Color) -> String {
        let width = self.options.bar_width;
        let filled = ((percentage / 100.0 * width as f64).round() as usize).min(width);
        format!(
            "{}{}",
            self.colorize(&"█".repeat(filled), color),
            self.colorize(&"░".repeat(width - filled), self.color_scheme.muted)
        )
    }

    fn write_statistics(&self, output: &mut String, stats: &AggregateStatistics) -> std::fmt::Result {
        writeln!(output, "{}", self.section("Summary"))?;
        writeln!(
            output,
            "  Duration:     {}",
            format_duration(stats.total_duration.as_secs_f64() * 1000.0)
        )?;
        writeln!(
            output,
            "  Requests:     {}",
            self.colorize(&stats.total_requests.to_string(), self.color_scheme.info)
        )?;
        writeln!(
            output,
            "  Successful:   {} ({})",
            self.colorize(&stats.successful_requests.to_string(), self.color_scheme.success),
            self.percentage_colored(stats.success_rate)
        )?;

        let failed_color = if stats.failed_requests > 0 {
            self.color_scheme.error
        } else {
            self.color_scheme.muted
        };
        writeln!(
            output,
            "  Failed:       {}",
            self.colorize(&stats.failed_requests.to_string(), failed_color)
        )?;
        if stats.timeout_requests > 0 {
            writeln!(
                output,
                "  Timeouts:     {}",
                self.colorize(&stats.timeout_requests.to_string(), self.color_scheme.warning)
            )?;
        }
        writeln!(output, "  Throughput:   {}", self.bold(&format!("{:.2} req/s", stats.requests_per_second)))?;
        write!(output, "  Received:     {}", format_bytes(stats.total_bytes))?;

        if stats.total_requests == 0 {
            write!(output, "\n\n{}", self.colorize("No requests were issued.", self.color_scheme.muted))?;
            return Ok(());
        }

        write!(output, "\n\n{}", self.section("Response Times"))?;
        for (label, value) in latency_rows(stats) {
            write!(output, "\n  {:<8} {:>12}", label, self.duration_colored(value))?;
        }

        write!(output, "\n\n{}", self.section("Status Codes"))?;
        for (&code, &count) in &stats.status_codes {
            let percentage = share(count, stats.total_requests);
            let color = self.color_scheme.status_color(StatusClass::from_code(code));
            write!(
                output,
                "\n  {:<6} {} {:>8} ({})",
                self.colorize(&status_label(code), color),
                self.share_bar(percentage, color),
                count,
                format_percentage(percentage)
            )?;
        }

        if !stats.top_errors.is_empty() {
            write!(output, "\n\n{}", self.section("Top Errors"))?;
            for (rank, error) in stats.top_errors.iter().enumerate() {
                write!(
                    output,
                    "\n  {}. {} {}",
                    rank + 1,
                    self.colorize(&error.message, self.color_scheme.error),
                    self.colorize(&format!("x{}", error.count), self.color_scheme.muted)
                )?;
            }
        }

        Ok(())
    }
}

impl OutputFormatter for ColoredFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let border = "═".repeat(title.chars().count() + 4);
        Ok(format!(
            "{}\n  {}  \n{}",
            self.colorize(&border, self.color_scheme.border),
            self.emphasize(title, self.color_scheme.header),
            self.colorize(&border, self.color_scheme.border)
        ))
    }

    fn format_config_summary(&self, config: &TestConfiguration) -> Result<String> {
        let mut output = self.section("Configuration");
        for line in display_config_summary(config).lines() {
            match line.split_once(": ") {
                Some((key, value)) => {
                    write!(output, "\n  {:<13} {}", format!("{}:", key), self.colorize(value, self.color_scheme.info))
                }
                None => write!(output, "\n  {}", line),
            }
            .map_err(|e| AppError::io(format!("Failed to format configuration: {}", e)))?;
        }
        Ok(output)
    }

    fn format_statistics(&self, stats: &AggregateStatistics) -> Result<String> {
        let mut output = String::new();
        self.write_statistics(&mut output, stats)
            .map_err(|e| AppError::io(format!("Failed to format statistics: {}", e)))?;
        Ok(output)
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("{} {}", self.colorize("✗", self.color_scheme.error), self.colorize(error, self.color_scheme.error)))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("{} {}", self.colorize("⚠", self.color_scheme.warning), self.colorize(warning, self.color_scheme.warning)))
    }
}
