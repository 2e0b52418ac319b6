//! Error types for GSI reconciliation

use std::fmt;
use thiserror::Error;

/// A failure reported by the backing store.
///
/// Carries the structured error `code` (e.g. `ThrottlingException`) when the
/// store supplied one, and a `name` for failures that never reached the
/// service (timeouts, dispatch failures). Retry classification looks at
/// `code` first and falls back to `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub code: Option<String>,
    pub name: Option<String>,
    pub message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            name: None,
            message: message.into(),
        }
    }

    /// Store error with a structured service error code
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            name: None,
            message: message.into(),
        }
    }

    /// Store error identified only by a generic failure name
    pub fn with_name(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: None,
            name: Some(name.into()),
            message: message.into(),
        }
    }

    /// The identifier used for retry classification
    pub fn error_code(&self) -> Option<&str> {
        self.code.as_deref().or(self.name.as_deref())
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.error_code() {
            Some(code) => write!(f, "{}: {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Errors from GSI reconciliation
#[derive(Debug, Error)]
pub enum GsiError {
    /// The declared index configuration is invalid. Lists every issue found.
    #[error("Invalid GSI configuration: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// The store rejected or failed a call (after any retries)
    #[error("Store error: {0}")]
    Store(StoreError),

    /// A blocking wait exceeded its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// An operation was missing the configuration its kind requires
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Invalid engine or client configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GsiError {
    pub fn validation(issues: Vec<String>) -> Self {
        Self::Validation(issues)
    }

    pub fn store(err: StoreError) -> Self {
        Self::Store(err)
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Code used to classify this error for retries, if it came from the store
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Store(err) => err.error_code(),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<StoreError> for GsiError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// Result type for GSI reconciliation
pub type Result<T> = std::result::Result<T, GsiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_prefers_code_over_name() {
        let err = StoreError {
            code: Some("ThrottlingException".to_string()),
            name: Some("ServiceError".to_string()),
            message: "slow down".to_string(),
        };
        assert_eq!(err.error_code(), Some("ThrottlingException"));

        let err = StoreError::with_name("TimeoutError", "request timed out");
        assert_eq!(err.error_code(), Some("TimeoutError"));

        assert_eq!(StoreError::new("boom").error_code(), None);
    }

    #[test]
    fn test_validation_message_lists_all_issues() {
        let err = GsiError::validation(vec![
            "Duplicate index name: GSI1".to_string(),
            "Index GSI2: partitionKey is required".to_string(),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("Duplicate index name: GSI1"));
        assert!(msg.contains("Index GSI2: partitionKey is required"));
    }

    #[test]
    fn test_only_store_errors_carry_codes() {
        let err = GsiError::from(StoreError::with_code("LimitExceededException", "busy"));
        assert_eq!(err.error_code(), Some("LimitExceededException"));
        assert_eq!(GsiError::timeout("table never settled").error_code(), None);
        assert!(GsiError::timeout("x").is_timeout());
    }
}
