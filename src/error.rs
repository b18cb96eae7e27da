//! Error types for migratectl
//!
//! This module defines the error handling strategy for migratectl. There are
//! two error types: `MigratectlError` (main error enum) and `ConfigError`
//! (configuration-specific).
//!
//! ## Error Handling Philosophy
//!
//! Library code uses `crate::error::Result<T>` which returns `MigratectlError`.
//! CLI code uses `anyhow::Result<T>` for top-level error handling. The
//! conversion happens at the CLI boundary using `anyhow::Error::from` to
//! preserve error chains.
//!
//! ## Batch vs. host errors
//!
//! Only two classes of error abort an estimation run: `InputValidation`
//! (raised before any remote call is made) and report-write failures
//! (`Io`/`Csv`/`Report` during emission). Everything else is recorded against
//! the single host that triggered it and surfaced in the failure summary.
//!
//! ## Retry Awareness
//!
//! Errors implement `IsRetryable` to indicate whether an operation should be
//! retried. The `RetryPolicy` in `src/retry.rs` uses this to determine retry
//! behavior. Only `PricingApi`, `Timeout`, and `Io` are retryable; invalid
//! input or a definitive "no price exists" answer will not become valid by
//! asking again.

use thiserror::Error;

/// Main error type for migratectl
#[derive(Error, Debug)]
pub enum MigratectlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Fatal input problem, detected before any remote call.
    #[error("Input validation error: {field} - {reason}")]
    InputValidation { field: String, reason: String },

    /// No instance type in the catalog satisfies both minimums.
    #[error("No instance type found for {vcpus} vCPU / {ram_gib} GiB RAM")]
    NoMatchFound { vcpus: u32, ram_gib: f64 },

    /// The pricing service has no entry for this type in this region.
    #[error("No price available for {instance_type} in {region}: {detail}")]
    PriceUnavailable {
        instance_type: String,
        region: String,
        detail: String,
    },

    /// Transient pricing/catalog API failure.
    #[error("Pricing API error during {operation}: {message}")]
    PricingApi {
        operation: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A remote lookup exceeded its deadline.
    #[error("Remote lookup timed out after {timeout_secs}s during {operation}")]
    Timeout {
        operation: String,
        timeout_secs: u64,
    },

    /// A retryable operation failed on every attempt.
    #[error("Operation failed after {attempts} attempts: {reason}")]
    RetryExhausted {
        attempts: u32,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Report error: {0}")]
    Report(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Failed to parse config: {0}")]
    ParseError(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, MigratectlError>;

/// Trait for determining if an error is retryable
///
/// Used by `RetryPolicy` implementations to determine whether an error
/// should trigger a retry attempt.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for MigratectlError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            MigratectlError::PricingApi { .. }
                | MigratectlError::Timeout { .. }
                | MigratectlError::Io(_)
        )
    }
}

impl MigratectlError {
    /// Whether this error aborts the whole batch rather than a single host.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MigratectlError::Config(_)
                | MigratectlError::InputValidation { .. }
                | MigratectlError::Spreadsheet(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        let api = MigratectlError::PricingApi {
            operation: "GetProducts".to_string(),
            message: "throttled".to_string(),
            source: None,
        };
        assert!(api.is_retryable());

        let timeout = MigratectlError::Timeout {
            operation: "DescribeReservedInstancesOfferings".to_string(),
            timeout_secs: 30,
        };
        assert!(timeout.is_retryable());

        let no_match = MigratectlError::NoMatchFound {
            vcpus: 512,
            ram_gib: 4096.0,
        };
        assert!(!no_match.is_retryable());

        let unavailable = MigratectlError::PriceUnavailable {
            instance_type: "m5.large".to_string(),
            region: "us-east-1".to_string(),
            detail: "no offerings".to_string(),
        };
        assert!(!unavailable.is_retryable());
    }

    #[test]
    fn fatal_classification() {
        let validation = MigratectlError::InputValidation {
            field: "CPUs".to_string(),
            reason: "column not found".to_string(),
        };
        assert!(validation.is_fatal());
        assert!(!validation.is_retryable());

        let unavailable = MigratectlError::PriceUnavailable {
            instance_type: "m5.large".to_string(),
            region: "us-east-1".to_string(),
            detail: "no offerings".to_string(),
        };
        assert!(!unavailable.is_fatal());
    }
}
