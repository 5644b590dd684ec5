//! Report rendering
//!
//! `PlainFormatter` writes bordered tables, `ColoredFormatter` writes a
//! colored layout for terminals, and `JsonFormatter` writes one JSON document.

mod colored;
mod formatter;
mod json;

pub use self::colored::{ColorScheme, ColoredFormatter, LatencyLevel};
pub use self::formatter::{
    format_bytes, format_duration, format_percentage, Alignment, Column, FormattingOptions, OutputFormatter,
    PlainFormatter, RowData, TableFormat,
};
pub use self::json::JsonFormatter;

use crate::{models::TestConfiguration, types::OutputFormat};

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Pick the formatter for the configured format and color preference
    pub fn create_formatter(config: &TestConfiguration) -> Box<dyn OutputFormatter> {
        match config.output_format {
            OutputFormat::Json => Box::new(JsonFormatter::new()),
            OutputFormat::Text => {
                let options = FormattingOptions {
                    enable_color: config.enable_color,
                    ..FormattingOptions::default()
                };
                if config.enable_color {
                    Box::new(ColoredFormatter::new(options))
                } else {
                    Box::new(PlainFormatter::new(options))
                }
            }
        }
    }

    /// Plain text formatter for scripts and logs
    pub fn create_plain_formatter() -> Box<dyn OutputFormatter> {
        Box::new(PlainFormatter::new(FormattingOptions {
            enable_color: false,
            ..FormattingOptions::default()
        }))
    }
}
