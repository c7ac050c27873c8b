//! # Error Types
//!
//! Structured error hierarchy for the license manager. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! Validation errors carry the rejected input and the expected format so
//! that operators can diagnose bad seed data or bad API payloads without
//! guesswork.

use thiserror::Error;

/// Top-level error type for the foundational layer.
#[derive(Error, Debug)]
pub enum LmError {
    /// A field or identifier failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration could not be read or is inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from validated newtype construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Salesforce opportunity ids are exactly 18 alphanumeric characters.
    #[error("invalid Salesforce opportunity id: \"{0}\" (expected exactly 18 alphanumeric characters)")]
    InvalidSalesforceId(String),

    /// Enterprise slugs are lowercase URL path segments.
    #[error("invalid enterprise slug: \"{0}\" (expected 1-128 characters of a-z, 0-9, '-' or '_')")]
    InvalidEnterpriseSlug(String),

    /// Email address failed the structural check.
    #[error("invalid email address: \"{0}\"")]
    InvalidEmail(String),

    /// Plan titles are non-empty and at most 128 characters.
    #[error("invalid plan title: \"{0}\" (expected 1-128 characters)")]
    InvalidPlanTitle(String),

    /// Timestamp string is not valid UTC RFC 3339.
    #[error("invalid timestamp: \"{value}\" ({reason})")]
    InvalidTimestamp {
        /// The string that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Portal configuration value is malformed.
    #[error("invalid portal configuration: {0}")]
    InvalidPortalConfig(String),
}
