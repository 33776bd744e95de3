use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for form compilation and task polling
#[derive(Debug, Error, Clone, Serialize, Deserialize)]
pub enum FormflowError {
    /// Malformed connector specification
    #[error("Schema error: {0}")]
    Schema(String),

    /// A state path could not be navigated
    #[error("Path error: {0}")]
    Path(String),

    /// An edit was applied to an unknown field or a field of the wrong kind
    #[error("Field error: {0}")]
    Field(String),

    /// A single value was rejected (e.g. not one of the allowed options)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Submit-time validation failed for one or more fields
    #[error("Form is invalid: {} field error(s)", errors.len())]
    InvalidForm { errors: Vec<ErrorInfo> },

    /// HTTP request errors (status 0 means the connection itself failed)
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    /// Request timeouts and exhausted poll budgets
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// The backend reported the task as `failed`
    #[error("Task {task_id} failed: {message}")]
    TaskFailed { task_id: String, message: String },

    /// The backend reported the task as `error`
    #[error("Task {task_id} errored: {message}")]
    TaskErrored { task_id: String, message: String },

    /// The poll chain was cancelled through its token
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Another job is already running for the same UI region
    #[error("Region busy: {0}")]
    Busy(String),

    /// JSON serialization/deserialization errors
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// I/O errors (file reading, etc.)
    #[error("IO error: {0}")]
    Io(String),

    /// Invalid client or poll configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FormflowError {
    /// Creates a new HTTP error
    pub fn http<S: Into<String>>(status: u16, message: S) -> Self {
        FormflowError::Http {
            status,
            message: message.into(),
        }
    }

    /// Convert from std::io::Error
    pub fn from_io(err: std::io::Error) -> Self {
        FormflowError::Io(err.to_string())
    }

    /// Convert from serde_json::Error
    pub fn from_serde(err: serde_json::Error) -> Self {
        FormflowError::Deserialization(err.to_string())
    }

    /// True for both terminal task failure states.
    ///
    /// Callers that only care whether the job succeeded should use this rather
    /// than matching a single variant, since backends report either one.
    pub fn is_task_failure(&self) -> bool {
        matches!(
            self,
            FormflowError::TaskFailed { .. } | FormflowError::TaskErrored { .. }
        )
    }

    /// Text suitable for a toast notification.
    pub fn user_message(&self) -> String {
        match self {
            FormflowError::Http { message, .. } if !message.is_empty() => message.clone(),
            FormflowError::TaskFailed { message, .. }
            | FormflowError::TaskErrored { message, .. } => message.clone(),
            FormflowError::InvalidForm { errors } => errors
                .first()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "Please fix the highlighted fields".to_string()),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for FormflowError {
    fn from(err: serde_json::Error) -> Self {
        FormflowError::from_serde(err)
    }
}

impl From<std::io::Error> for FormflowError {
    fn from(err: std::io::Error) -> Self {
        FormflowError::from_io(err)
    }
}

/// Type alias for Result with FormflowError
pub type Result<T> = std::result::Result<T, FormflowError>;

/// Structured error information attached to a single form field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorInfo {
    /// Error code (e.g., "REQUIRED", "PATTERN_MISMATCH")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Dot-notation path of the offending value (e.g., "credentials.access_key")
    pub path: Option<String>,

    /// ID of the field descriptor that produced the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_id: Option<String>,

    /// Timestamp when the error was recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl ErrorInfo {
    /// Create a simple error info with just code, message, and optional path
    pub fn simple(code: impl Into<String>, message: impl Into<String>, path: Option<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            path,
            field_id: None,
            timestamp: Some(Utc::now().to_rfc3339()),
        }
    }

    /// Create a builder for ErrorInfo
    pub fn builder(code: impl Into<String>, message: impl Into<String>) -> ErrorInfoBuilder {
        ErrorInfoBuilder::new(code, message)
    }
}

/// Builder for creating ErrorInfo instances with a fluent API
pub struct ErrorInfoBuilder {
    code: String,
    message: String,
    path: Option<String>,
    field_id: Option<String>,
    timestamp: Option<String>,
}

impl ErrorInfoBuilder {
    /// Create a new ErrorInfoBuilder with required fields
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            path: None,
            field_id: None,
            timestamp: Some(Utc::now().to_rfc3339()),
        }
    }

    /// Set the error path
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the field ID
    pub fn field_id(mut self, id: impl Into<String>) -> Self {
        self.field_id = Some(id.into());
        self
    }

    /// Set custom timestamp (defaults to now if not set)
    pub fn timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Build the ErrorInfo instance
    pub fn build(self) -> ErrorInfo {
        ErrorInfo {
            code: self.code,
            message: self.message,
            path: self.path,
            field_id: self.field_id,
            timestamp: self.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_failure_covers_both_states() {
        let failed = FormflowError::TaskFailed {
            task_id: "t1".to_string(),
            message: "dbt run failed".to_string(),
        };
        let errored = FormflowError::TaskErrored {
            task_id: "t1".to_string(),
            message: "worker crashed".to_string(),
        };

        assert!(failed.is_task_failure());
        assert!(errored.is_task_failure());
        assert!(!FormflowError::http(500, "boom").is_task_failure());
        assert!(!FormflowError::Cancelled("t1".to_string()).is_task_failure());
    }

    #[test]
    fn test_user_message_prefers_backend_detail() {
        let err = FormflowError::http(400, "Organization not found");
        assert_eq!(err.user_message(), "Organization not found");

        let err = FormflowError::http(0, "");
        assert_eq!(err.user_message(), "HTTP error: 0 - ");

        let err = FormflowError::TaskFailed {
            task_id: "t1".to_string(),
            message: "Failed to summarize logs".to_string(),
        };
        assert_eq!(err.user_message(), "Failed to summarize logs");
    }

    #[test]
    fn test_invalid_form_message() {
        let err = FormflowError::InvalidForm {
            errors: vec![ErrorInfo::simple("REQUIRED", "Host is required", None)],
        };
        assert_eq!(err.to_string(), "Form is invalid: 1 field error(s)");
        assert_eq!(err.user_message(), "Host is required");
    }

    #[test]
    fn test_error_info_builder() {
        // Test basic builder
        let error = ErrorInfo::builder("REQUIRED", "Test message").build();
        assert_eq!(error.code, "REQUIRED");
        assert_eq!(error.message, "Test message");
        assert!(error.timestamp.is_some());
        assert!(error.path.is_none());

        // Test full builder
        let error = ErrorInfo::builder("PATTERN_MISMATCH", "Host does not match pattern")
            .path("tunnel.host")
            .field_id("tunnel.host")
            .timestamp("2024-01-01T00:00:00Z")
            .build();

        assert_eq!(error.path, Some("tunnel.host".to_string()));
        assert_eq!(error.field_id, Some("tunnel.host".to_string()));
        assert_eq!(error.timestamp, Some("2024-01-01T00:00:00Z".to_string()));
    }
}
