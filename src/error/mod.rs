//! Error handling for the network load tester
//!
//! Only configuration-class errors ever leave a run. Network failures of
//! individual requests are folded into `RequestOutcome` values by the senders.

use thiserror::Error;

/// Custom error types for the network load tester
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A dispatcher precondition was violated
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Network setup errors (client construction, socket setup)
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP request errors
    #[error("HTTP request error: {0}")]
    HttpRequest(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors (file operations, sockets)
    #[error("I/O error: {0}")]
    Io(String),

    /// Parsing errors (URLs, JSON, numbers)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// Test execution errors
    #[error("Test execution error: {0}")]
    TestExecution(String),


    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new invalid argument error
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network(message.into())
    }

    /// Create a new HTTP request error
    pub fn http_request<S: Into<String>>(message: S) -> Self {
        Self::HttpRequest(message.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new test execution error
    pub fn test_execution<S: Into<String>>(message: S) -> Self {
        Self::TestExecution(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::InvalidArgument(_) => "ARGUMENT",
            Self::Network(_) => "NETWORK",
            Self::HttpRequest(_) => "HTTP",
            Self::Timeout(_) => "TIMEOUT",
            Self::Validation(_) => "VALIDATION",
            Self::Io(_) => "IO",
            Self::Parse(_) => "PARSE",
            Self::TestExecution(_) => "TEST",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Whether the error stems from the run's configuration rather than the network
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::InvalidArgument(_) | Self::Validation(_) | Self::Parse(_)
        )
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::InvalidArgument(_) | Self::Validation(_) | Self::Parse(_) => 1,
            Self::Network(_) | Self::HttpRequest(_) => 2,
            Self::Timeout(_) => 3,
            Self::Io(_) => 5,
            Self::TestExecution(_) => 6,
            Self::Internal(_) => 99,
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if !use_color {
            return format!("[{}] {}", category, message);
        }

        use colored::Colorize;
        match self {
            Self::Config(_) | Self::InvalidArgument(_) | Self::Validation(_) | Self::Parse(_) => {
                format!("[{}] {}", category.red().bold(), message.red())
            }
            Self::Network(_) | Self::HttpRequest(_) => {
                format!("[{}] {}", category.yellow().bold(), message.yellow())
            }
            Self::Timeout(_) => {
                format!("[{}] {}", category.blue().bold(), message.blue())
            }
            Self::Io(_) | Self::TestExecution(_) => {
                format!("[{}] {}", category.cyan().bold(), message.cyan())
            }
            Self::Internal(_) => {
                format!("[{}] {}", category.bright_red().bold(), message.bright_red())
            }
        }
    }

    /// Short hint printed under the error in the CLI
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Config(_) | Self::InvalidArgument(_) | Self::Validation(_) => Some(
                "Check the target, --protocol/--port pairing, and numeric limits (-n, -c, --timeout).",
            ),
            Self::Parse(_) => Some("Check the format of flags, environment variables and the .env file."),
            Self::Network(_) => Some("The transport could not be set up; verify TLS and proxy settings."),
            Self::Internal(_) => Some("This is likely a bug. Please report it with the command line used."),
            _ => None,
        }
    }
}

// Standard library error conversions
impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(error: url::ParseError) -> Self {
        Self::parse(format!("URL parse error: {}", error))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("JSON error: {}", error))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::timeout(error.to_string())
        } else if error.is_builder() {
            Self::network(error.to_string())
        } else {
            Self::http_request(error.to_string())
        }
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::parse(format!("Integer parse error: {}", error))
    }
}

impl From<std::str::ParseBoolError> for AppError {
    fn from(error: std::str::ParseBoolError) -> Self {
        Self::parse(format!("Boolean parse error: {}", error))
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Error context trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error, keeping its category
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Add static context to an error
    fn context(self, message: &'static str) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<AppError>,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let context = f();
            match e.into() {
                AppError::Config(m) => AppError::Config(format!("{}: {}", context, m)),
                AppError::Network(m) => AppError::Network(format!("{}: {}", context, m)),
                AppError::Io(m) => AppError::Io(format!("{}: {}", context, m)),
                AppError::Parse(m) => AppError::Parse(format!("{}: {}", context, m)),
                other => AppError::internal(format!("{}: {}", context, other)),
            }
        })
    }

    fn context(self, message: &'static str) -> Result<T> {
        self.with_context(|| message.to_string())
    }
}

/// Error reporter for user feedback on stderr
pub struct ErrorReporter {
    pub use_color: bool,
    pub verbose: bool,
}

impl ErrorReporter {
    /// Create a new error reporter
    pub fn new(use_color: bool, verbose: bool) -> Self {
        Self { use_color, verbose }
    }

    /// Render the report for an error without printing it
    pub fn render(&self, error: &AppError) -> String {
        let mut out = error.format_for_console(self.use_color);
        if let Some(hint) = error.suggestion() {
            out.push_str("\n\nSuggestion: ");
            out.push_str(hint);
        }
        if self.verbose {
            out.push_str(&format!("\n(category: {}, exit code: {})", error.category(), error.exit_code()));
        }
        out
    }

    /// Report an error to the user
    pub fn report_error(&self, error: &AppError) {
        eprintln!("{}", self.render(error));
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}
