//! # Authentication & Authorization Middleware
//!
//! Bearer token middleware with enterprise role-based access control.
//!
//! ## Token Format
//!
//! ```text
//! Bearer {system_role}:{enterprise_uuid}:{secret}
//! Bearer {secret}                                  (operator, all enterprises)
//! ```
//!
//! `system_role` is one of `enterprise_admin`, `enterprise_learner`, or
//! `enterprise_openedx_operator`. The enterprise uuid may be empty only for
//! operators.
//!
//! ## CallerIdentity
//!
//! Every authenticated request gets a [`CallerIdentity`] injected into the
//! request extensions. Handlers extract it via the `FromRequestParts` impl.

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use subtle::ConstantTimeEq;

use lm_core::EnterpriseCustomerId;
use lm_state::{RoleAssignment, SystemRole};

use crate::error::{AppError, ErrorBody, ErrorDetail};

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerIdentity {
    pub role: SystemRole,
    /// Feature role and the enterprise it applies to.
    pub assignment: RoleAssignment,
}

impl CallerIdentity {
    /// All-access identity used for bare-secret tokens and when auth is off.
    pub fn operator() -> Self {
        Self {
            role: SystemRole::EnterpriseOperator,
            assignment: RoleAssignment::operator(),
        }
    }

    pub fn is_operator(&self) -> bool {
        self.role.is_all_access()
    }

    pub fn has_admin_access(&self, enterprise: &EnterpriseCustomerId) -> bool {
        self.assignment.has_admin_access(enterprise)
    }

    pub fn has_learner_or_admin_access(&self, enterprise: &EnterpriseCustomerId) -> bool {
        self.assignment.has_learner_or_admin_access(enterprise)
    }
}

/// Extracts the identity that the auth middleware injected into extensions.
/// Returns 401 if no identity is present.
impl<S: Send + Sync> FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .copied()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

/// 403 unless the caller administers `enterprise`.
pub fn require_admin(
    caller: &CallerIdentity,
    enterprise: &EnterpriseCustomerId,
) -> Result<(), AppError> {
    if caller.has_admin_access(enterprise) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "admin access to enterprise {enterprise} required"
        )))
    }
}

/// 403 unless the caller is a learner or admin of `enterprise`.
pub fn require_learner_or_admin(
    caller: &CallerIdentity,
    enterprise: &EnterpriseCustomerId,
) -> Result<(), AppError> {
    if caller.has_learner_or_admin_access(enterprise) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "learner or admin access to enterprise {enterprise} required"
        )))
    }
}

/// 403 unless the caller is an operator.
pub fn require_operator(caller: &CallerIdentity) -> Result<(), AppError> {
    if caller.is_operator() {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "role '{}' required, caller has '{}'",
            SystemRole::EnterpriseOperator,
            caller.role
        )))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value.
#[derive(Clone)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison of bearer secrets. On a length mismatch a dummy
/// comparison still runs.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse a bearer token in format `{role}:{enterprise_uuid}:{secret}` or
/// `{secret}`.
pub fn parse_bearer_token(provided: &str, expected_secret: &str) -> Result<CallerIdentity, String> {
    let parts: Vec<&str> = provided.splitn(3, ':').collect();

    match parts.as_slice() {
        [secret] => {
            if constant_time_token_eq(secret, expected_secret) {
                Ok(CallerIdentity::operator())
            } else {
                Err("invalid bearer token".into())
            }
        }
        [role, enterprise, secret] => {
            if !constant_time_token_eq(secret, expected_secret) {
                return Err("invalid bearer token".into());
            }
            let role: SystemRole = role.parse().map_err(|e| format!("{e}"))?;
            let enterprise = if enterprise.is_empty() {
                None
            } else {
                Some(
                    enterprise
                        .parse::<EnterpriseCustomerId>()
                        .map_err(|e| format!("invalid enterprise uuid: {e}"))?,
                )
            };
            let assignment =
                RoleAssignment::from_system_role(role, enterprise).map_err(|e| format!("{e}"))?;
            Ok(CallerIdentity { role, assignment })
        }
        _ => Err("invalid token format, expected {role}:{enterprise_uuid}:{secret} or {secret}".into()),
    }
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Validate the Bearer token and inject the caller's identity.
///
/// When `AuthConfig.token` is `None`, every request runs as an operator.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let expected_token = request.extensions().get::<AuthConfig>().cloned();

    match expected_token {
        Some(AuthConfig {
            token: Some(ref expected),
        }) => {
            let auth_header = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok());

            match auth_header.map(|value| value.strip_prefix("Bearer ")) {
                Some(Some(provided)) => match parse_bearer_token(provided, expected) {
                    Ok(identity) => {
                        tracing::debug!(role = %identity.role, context = %identity.assignment.context(), "caller authenticated");
                        request.extensions_mut().insert(identity);
                        next.run(request).await
                    }
                    Err(msg) => {
                        tracing::warn!(reason = %msg, "authentication failed: invalid bearer token");
                        unauthorized_response(&msg)
                    }
                },
                Some(None) => {
                    tracing::warn!("authentication failed: non-Bearer authorization scheme");
                    unauthorized_response("authorization header must use Bearer scheme")
                }
                None => {
                    tracing::warn!("authentication failed: missing authorization header");
                    unauthorized_response("missing authorization header")
                }
            }
        }
        _ => {
            request.extensions_mut().insert(CallerIdentity::operator());
            next.run(request).await
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
