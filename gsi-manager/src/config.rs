//! Retry and wait configuration
//!
//! [`ErrorHandlingConfig`] is supplied once per declaration (as a partial
//! [`ErrorHandlingOverrides`] merged over the defaults) and stays fixed for
//! the life of a reconciliation.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;

/// Store error codes retried by default
pub const DEFAULT_RETRYABLE_ERROR_CODES: &[&str] = &[
    "ThrottlingException",
    "ProvisionedThroughputExceededException",
    "LimitExceededException",
    "RequestLimitExceeded",
    "TooManyRequestsException",
    "InternalServerError",
    "ServiceUnavailable",
];

pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

/// Retry policy for store calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorHandlingConfig {
    /// Retries after the initial attempt
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub retryable_error_codes: BTreeSet<String>,
}

impl Default for ErrorHandlingConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            retryable_error_codes: DEFAULT_RETRYABLE_ERROR_CODES
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

impl ErrorHandlingConfig {
    pub fn is_retryable_code(&self, code: &str) -> bool {
        self.retryable_error_codes.contains(code)
    }
}

/// Numeric property that may arrive as a JSON number or a numeric string
///
/// Lifecycle frameworks commonly stringify every property value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Int(i64),
    Text(String),
}

impl Numeric {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Partial error handling settings as declared
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ErrorHandlingOverrides {
    #[serde(rename = "maxRetries", alias = "MaxRetries", default)]
    pub max_retries: Option<Numeric>,
    #[serde(rename = "baseDelayMs", alias = "BaseDelayMs", default)]
    pub base_delay_ms: Option<Numeric>,
    #[serde(rename = "maxDelayMs", alias = "MaxDelayMs", default)]
    pub max_delay_ms: Option<Numeric>,
    #[serde(
        rename = "retryableErrorCodes",
        alias = "RetryableErrorCodes",
        default
    )]
    pub retryable_error_codes: Option<Vec<String>>,
}

impl ErrorHandlingOverrides {
    /// Merge over the defaults, collecting a message for every invalid value
    pub fn merge(&self, issues: &mut Vec<String>) -> ErrorHandlingConfig {
        let mut config = ErrorHandlingConfig::default();

        if let Some(value) = &self.max_retries {
            match value.as_i64().and_then(|n| u32::try_from(n).ok()) {
                Some(n) => config.max_retries = n,
                None => issues.push(format!("errorHandling.maxRetries is invalid: {value:?}")),
            }
        }
        if let Some(value) = &self.base_delay_ms {
            match value.as_i64().and_then(|n| u64::try_from(n).ok()) {
                Some(n) => config.base_delay_ms = n,
                None => issues.push(format!("errorHandling.baseDelayMs is invalid: {value:?}")),
            }
        }
        if let Some(value) = &self.max_delay_ms {
            match value.as_i64().and_then(|n| u64::try_from(n).ok()) {
                Some(n) => config.max_delay_ms = n,
                None => issues.push(format!("errorHandling.maxDelayMs is invalid: {value:?}")),
            }
        }
        if let Some(codes) = &self.retryable_error_codes {
            config.retryable_error_codes = codes.iter().cloned().collect();
        }

        config
    }
}

/// Shape of the blocking waiters in the store adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(3),
            max_delay: Duration::from_secs(20),
            timeout: Duration::from_secs(15 * 60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ErrorHandlingConfig::default();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.base_delay_ms, 1000);
        assert_eq!(config.max_delay_ms, 30000);
        assert!(config.is_retryable_code("ThrottlingException"));
        assert!(config.is_retryable_code("ServiceUnavailable"));
        assert!(!config.is_retryable_code("ValidationException"));
        assert!(!config.is_retryable_code("ResourceInUseException"));
    }

    #[test]
    fn test_overrides_merge_over_defaults() {
        let overrides: ErrorHandlingOverrides = serde_json::from_value(serde_json::json!({
            "MaxRetries": "2",
            "baseDelayMs": 50,
        }))
        .unwrap();

        let mut issues = Vec::new();
        let config = overrides.merge(&mut issues);
        assert!(issues.is_empty());
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.base_delay_ms, 50);
        assert_eq!(config.max_delay_ms, DEFAULT_MAX_DELAY_MS);
        assert!(config.is_retryable_code("ThrottlingException"));
    }

    #[test]
    fn test_overrides_replace_retryable_codes() {
        let overrides: ErrorHandlingOverrides = serde_json::from_value(serde_json::json!({
            "retryableErrorCodes": ["ResourceInUseException"],
        }))
        .unwrap();

        let config = overrides.merge(&mut Vec::new());
        assert!(config.is_retryable_code("ResourceInUseException"));
        assert!(!config.is_retryable_code("ThrottlingException"));
    }

    #[test]
    fn test_invalid_overrides_are_reported() {
        let overrides: ErrorHandlingOverrides = serde_json::from_value(serde_json::json!({
            "maxRetries": "lots",
            "maxDelayMs": -1,
        }))
        .unwrap();

        let mut issues = Vec::new();
        let config = overrides.merge(&mut issues);
        assert_eq!(issues.len(), 2);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    }
}
