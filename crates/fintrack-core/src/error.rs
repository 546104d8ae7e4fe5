//! Error types for fintrack-core
//!
//! Every failure the engine can hit (transport, backend rejection, lookup
//! failure, invalid user input, misconfiguration) is a [`CoreError`]. Pages
//! turn them into an inline notice through [`CoreError::to_details`].

use thiserror::Error;
use serde::{Deserialize, Serialize};
use std::io;

use fintrack_utils::FormatError;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Record not in the collection or backend
    EntityNotFound,
    /// Backend could not be reached
    Transport,
    /// Backend refused the mutation
    Rejected,
    /// Option source failed to load
    LookupFailed,
    /// No option source registered under that name
    UnknownOptionSource,
    /// No filter criterion under that name
    UnknownFilter,
    /// Page does not use filters
    FiltersDisabled,
    /// Action not allowed in the current row state
    InvalidState,
    /// Value could not be parsed or converted
    InvalidFormat,
    /// Page configuration error
    ConfigError,
    /// IO error
    IoError,
    /// Internal error
    InternalError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::EntityNotFound => write!(f, "ENTITY_NOT_FOUND"),
            ErrorCode::Transport => write!(f, "TRANSPORT"),
            ErrorCode::Rejected => write!(f, "REJECTED"),
            ErrorCode::LookupFailed => write!(f, "LOOKUP_FAILED"),
            ErrorCode::UnknownOptionSource => write!(f, "UNKNOWN_OPTION_SOURCE"),
            ErrorCode::UnknownFilter => write!(f, "UNKNOWN_FILTER"),
            ErrorCode::FiltersDisabled => write!(f, "FILTERS_DISABLED"),
            ErrorCode::InvalidState => write!(f, "INVALID_STATE"),
            ErrorCode::InvalidFormat => write!(f, "INVALID_FORMAT"),
            ErrorCode::ConfigError => write!(f, "CONFIG_ERROR"),
            ErrorCode::IoError => write!(f, "IO_ERROR"),
            ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
        }
    }
}

/// Detailed error information for the inline notice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Suggestions for resolution
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ErrorDetails {
    /// Create a new error detail
    pub fn new(code: ErrorCode, message: String) -> Self {
        Self {
            code,
            message,
            details: None,
            suggestions: vec![],
        }
    }

    /// Add detail information
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.details = Some(detail);
        self
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: String) -> Self {
        self.suggestions.push(suggestion);
        self
    }
}

impl std::fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, "\nDetails: {}", details)?;
        }
        if !self.suggestions.is_empty() {
            write!(f, "\nSuggestions:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n  - {}", suggestion)?;
            }
        }
        Ok(())
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Informational
    Info,
    /// Warning - the action was refused, nothing changed
    Warning,
    /// Error - operation failed
    Error,
    /// Critical - page cannot work as configured
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "info"),
            ErrorSeverity::Warning => write!(f, "warning"),
            ErrorSeverity::Error => write!(f, "error"),
            ErrorSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Main error type for fintrack-core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Entity not found: {uuid}")]
    EntityNotFound { uuid: String },

    #[error("Backend unreachable: {message}")]
    Transport { message: String },

    #[error("Rejected by backend: {message}")]
    Rejected { message: String },

    #[error("Could not load options '{source_name}': {message}")]
    LookupFailed { source_name: String, message: String },

    #[error("Unknown option source: {name}")]
    UnknownOptionSource { name: String },

    #[error("Unknown filter: {name}")]
    UnknownFilter { name: String },

    #[error("Filters are not enabled for {entity}")]
    FiltersDisabled { entity: String },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("IO error: {message}")]
    IoError { message: String },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl CoreError {
    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::EntityNotFound { .. } => ErrorCode::EntityNotFound,
            CoreError::Transport { .. } => ErrorCode::Transport,
            CoreError::Rejected { .. } => ErrorCode::Rejected,
            CoreError::LookupFailed { .. } => ErrorCode::LookupFailed,
            CoreError::UnknownOptionSource { .. } => ErrorCode::UnknownOptionSource,
            CoreError::UnknownFilter { .. } => ErrorCode::UnknownFilter,
            CoreError::FiltersDisabled { .. } => ErrorCode::FiltersDisabled,
            CoreError::InvalidState { .. } => ErrorCode::InvalidState,
            CoreError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            CoreError::ConfigError { .. } => ErrorCode::ConfigError,
            CoreError::IoError { .. } => ErrorCode::IoError,
            CoreError::InternalError { .. } => ErrorCode::InternalError,
        }
    }

    /// Get the severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CoreError::EntityNotFound { .. } => ErrorSeverity::Info,
            CoreError::Transport { .. } => ErrorSeverity::Error,
            CoreError::Rejected { .. } => ErrorSeverity::Warning,
            CoreError::LookupFailed { .. } => ErrorSeverity::Error,
            CoreError::UnknownOptionSource { .. } => ErrorSeverity::Critical,
            CoreError::UnknownFilter { .. } => ErrorSeverity::Warning,
            CoreError::FiltersDisabled { .. } => ErrorSeverity::Warning,
            CoreError::InvalidState { .. } => ErrorSeverity::Warning,
            CoreError::InvalidFormat { .. } => ErrorSeverity::Warning,
            CoreError::ConfigError { .. } => ErrorSeverity::Critical,
            CoreError::IoError { .. } => ErrorSeverity::Error,
            CoreError::InternalError { .. } => ErrorSeverity::Critical,
        }
    }

    /// Convert to detailed error info
    pub fn to_details(&self) -> ErrorDetails {
        let mut details = ErrorDetails::new(self.code(), self.to_string());

        match self {
            CoreError::EntityNotFound { uuid } => {
                details = details.with_detail(serde_json::json!({ "uuid": uuid }));
                details = details.with_suggestion(
                    "The record may have been deleted elsewhere; reload the list.".to_string()
                );
            }
            CoreError::Transport { .. } => {
                details = details.with_suggestion(
                    "Check that the backend is running, then retry.".to_string()
                );
            }
            CoreError::Rejected { message } => {
                details = details.with_detail(serde_json::json!({ "backend_message": message }));
                details = details.with_suggestion(
                    "Review the submitted values and try again.".to_string()
                );
            }
            CoreError::LookupFailed { source_name, .. } => {
                details = details.with_suggestion(format!(
                    "Refresh the '{}' options to try loading them again.", source_name
                ));
            }
            CoreError::InvalidState { .. } => {
                details = details.with_suggestion(
                    "Finish or cancel the current edit first.".to_string()
                );
            }
            CoreError::InvalidFormat { message } => {
                details = details.with_detail(serde_json::json!({ "format_message": message }));
                details = details.with_suggestion(
                    "Dates use MM/DD/YYYY; amounts are plain numbers.".to_string()
                );
            }
            _ => {}
        }

        details
    }
}

/// Result type with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl From<io::Error> for CoreError {
    fn from(error: io::Error) -> Self {
        CoreError::IoError { message: error.to_string() }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(error: serde_json::Error) -> Self {
        CoreError::InvalidFormat { message: error.to_string() }
    }
}

impl From<FormatError> for CoreError {
    fn from(error: FormatError) -> Self {
        CoreError::InvalidFormat { message: error.to_string() }
    }
}

/// Error context for reporting
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Operation being performed
    pub operation: String,
    /// Additional context data
    pub data: serde_json::Value,
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(operation: String) -> Self {
        Self {
            operation,
            data: serde_json::json!({}),
        }
    }

    /// Add context data
    pub fn with_data(mut self, key: &str, value: serde_json::Value) -> Self {
        self.data[key] = value;
        self
    }
}

/// Error logger trait
pub trait ErrorLogger: Send + Sync {
    /// Log an error
    fn log_error(&self, error: &CoreError, context: &ErrorContext);
}

/// Default error logger using log crate
#[derive(Default)]
pub struct DefaultErrorLogger;

impl ErrorLogger for DefaultErrorLogger {
    fn log_error(&self, error: &CoreError, context: &ErrorContext) {
        match error.severity() {
            ErrorSeverity::Info | ErrorSeverity::Warning => log::warn!(
                target: "fintrack::error",
                "[{}] {} - Operation: {} - Context: {}",
                error.code(),
                error,
                context.operation,
                context.data
            ),
            ErrorSeverity::Error | ErrorSeverity::Critical => log::error!(
                target: "fintrack::error",
                "[{}] {} - Operation: {} - Context: {}",
                error.code(),
                error,
                context.operation,
                context.data
            ),
        }
    }
}

// ==================== Tests ====================
