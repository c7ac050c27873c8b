//! # Retirement API
//!
//! Removes learner PII from licenses: on request for one learner, and in
//! bulk for licenses revoked long enough ago.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use lm_core::Timestamp;

use crate::auth::{require_operator, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::routes::parse_email;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RetireUserRequest {
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub lms_user_id: Option<u64>,
}

impl Validate for RetireUserRequest {
    fn validate(&self) -> Result<(), String> {
        if self.user_email.is_none() && self.lms_user_id.is_none() {
            return Err("user_email or lms_user_id is required".into());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RetirementResponse {
    pub num_licenses_retired: usize,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/retirements", post(retire_user))
        .route("/v1/retirements/revoked-licenses", post(retire_revoked_licenses))
}

/// POST /v1/retirements: Retire one learner.
///
/// Non-revoked licenses go back to the unassigned pool. Revoked licenses
/// keep their status and lose their PII.
#[utoipa::path(
    post,
    path = "/v1/retirements",
    request_body = RetireUserRequest,
    responses(
        (status = 200, description = "Learner retired", body = RetirementResponse),
        (status = 422, description = "No learner identified", body = crate::error::ErrorBody),
    ),
    tag = "retirements"
)]
pub async fn retire_user(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<RetireUserRequest>, JsonRejection>,
) -> Result<Json<RetirementResponse>, AppError> {
    require_operator(&caller)?;
    let req = extract_validated_json(body)?;
    let email = req.user_email.as_deref().map(parse_email).transpose()?;
    let num_licenses_retired =
        state
            .registry
            .write()
            .retire_user(email.as_ref(), req.lms_user_id, Timestamp::now());
    Ok(Json(RetirementResponse {
        num_licenses_retired,
    }))
}

/// POST /v1/retirements/revoked-licenses: Clear PII from stale revocations.
#[utoipa::path(
    post,
    path = "/v1/retirements/revoked-licenses",
    responses(
        (status = 200, description = "Stale revoked licenses retired", body = RetirementResponse),
    ),
    tag = "retirements"
)]
pub async fn retire_revoked_licenses(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<RetirementResponse>, AppError> {
    require_operator(&caller)?;
    let num_licenses_retired = state
        .registry
        .write()
        .retire_stale_revoked_licenses(Timestamp::now());
    Ok(Json(RetirementResponse {
        num_licenses_retired,
    }))
}
