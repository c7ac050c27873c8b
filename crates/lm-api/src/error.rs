//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps domain errors from lm-core, lm-state, and lm-notify to HTTP status
//! codes with a JSON body of error code, message, and optional details.
//! Internal error details never reach clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use lm_core::ValidationError;
use lm_notify::NotifyError;
use lm_state::{CatalogError, LicenseError, PlanError, RegistryError, RenewalError};

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details, present only for some client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body or query could not be parsed (422).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid credentials (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller lacks the required permission (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Conflict with current resource state (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The revocation cap of a plan is used up (409).
    #[error("revocation cap reached: {message}")]
    RevocationCapReached {
        message: String,
        applied: u64,
        allowed: u64,
    },

    /// Internal server error (500). Logged, never returned to the client.
    #[error("internal error: {0}")]
    Internal(String),

    /// Optional component not configured, or an upstream service is down (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// An upstream service answered with garbage (502).
    #[error("bad gateway: {0}")]
    BadGateway(String),
}

impl AppError {
    /// HTTP status and machine-readable code.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::UNPROCESSABLE_ENTITY, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::RevocationCapReached { .. } => (StatusCode::CONFLICT, "REVOCATION_CAP_REACHED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            Self::BadGateway(_) => (StatusCode::BAD_GATEWAY, "BAD_GATEWAY"),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::RevocationCapReached {
                applied, allowed, ..
            } => Some(serde_json::json!({
                "num_revocations_applied": applied,
                "num_revocations_allowed": allowed,
            })),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::ServiceUnavailable(_) => tracing::warn!(error = %self, "service unavailable"),
            Self::BadGateway(_) => tracing::warn!(error = %self, "bad upstream response"),
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

// ─── Domain conversions ──────────────────────────────────────────────

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<LicenseError> for AppError {
    fn from(err: LicenseError) -> Self {
        match err {
            LicenseError::UnknownStatus(_) => Self::Validation(err.to_string()),
            LicenseError::InvalidTransition { .. }
            | LicenseError::NotRemindable(_)
            | LicenseError::ActivatedByOtherLearner { .. } => Self::Conflict(err.to_string()),
        }
    }
}

impl From<PlanError> for AppError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::RevocationCapReached {
                applied, allowed, ..
            } => Self::RevocationCapReached {
                message: err.to_string(),
                applied,
                allowed,
            },
            PlanError::License(inner) => inner.into(),
            PlanError::NoLicenseForEmail(_) | PlanError::NoLicenseForKey(_) => {
                Self::NotFound(err.to_string())
            }
            PlanError::AlreadyAllocated(_) | PlanError::DuplicateLearner(_) => {
                Self::Conflict(err.to_string())
            }
            PlanError::InvalidDates { .. }
            | PlanError::InvalidRevokePercentage(_)
            | PlanError::TooManyLicenses { .. }
            | PlanError::MissingCatalog
            | PlanError::NotEnoughUnassignedLicenses { .. }
            | PlanError::DuplicateEmail(_) => Self::Validation(err.to_string()),
        }
    }
}

impl From<RenewalError> for AppError {
    fn from(err: RenewalError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::EmptyQuery => Self::Validation(err.to_string()),
            CatalogError::Unavailable(_) => Self::ServiceUnavailable(err.to_string()),
            CatalogError::BadResponse(_) => Self::BadGateway(err.to_string()),
        }
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Plan(inner) => inner.into(),
            RegistryError::Renewal(inner) => inner.into(),
            RegistryError::Validation(inner) => inner.into(),
            RegistryError::AgreementNotFound(_)
            | RegistryError::PlanNotFound(_)
            | RegistryError::RenewalNotFound(_)
            | RegistryError::UnknownActivationKey(_) => Self::NotFound(err.to_string()),
            RegistryError::RenewalCapacity { .. } => Self::Validation(err.to_string()),
            RegistryError::DuplicateEnterprise(_)
            | RegistryError::DuplicateSlug(_)
            | RegistryError::DuplicatePlanTitle { .. }
            | RegistryError::DuplicateRenewal(_)
            | RegistryError::RenewalAlreadyProcessed(_)
            | RegistryError::NotYetExpired { .. }
            | RegistryError::ExpirationAlreadyProcessed(_) => Self::Conflict(err.to_string()),
        }
    }
}

/// Composition failures are server-side defects.
impl From<NotifyError> for AppError {
    fn from(err: NotifyError) -> Self {
        Self::Internal(err.to_string())
    }
}
