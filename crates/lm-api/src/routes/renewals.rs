//! # Renewals API
//!
//! Operators schedule a renewal against a prior plan and later process it,
//! which creates the renewed plan and carries allocated licenses over.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use lm_core::{RenewalId, SalesforceOpportunityId, SubscriptionPlanId, Timestamp};
use lm_state::RenewalTerms;

use crate::auth::{require_operator, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::routes::{today, PlanView, RenewalView};
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRenewalRequest {
    pub prior_subscription_plan: Uuid,
    pub salesforce_opportunity_id: String,
    pub number_of_licenses: u64,
    pub effective_date: NaiveDate,
    pub renewed_expiration_date: NaiveDate,
}

impl Validate for CreateRenewalRequest {
    fn validate(&self) -> Result<(), String> {
        if self.renewed_expiration_date <= self.effective_date {
            return Err("renewed_expiration_date must be after effective_date".into());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProcessRenewalResponse {
    pub renewal: RenewalView,
    pub renewed_subscription_plan: PlanView,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/renewals", post(create_renewal))
        .route("/v1/renewals/{id}/process", post(process_renewal))
}

/// POST /v1/renewals: Schedule a renewal of a plan.
#[utoipa::path(
    post,
    path = "/v1/renewals",
    request_body = CreateRenewalRequest,
    responses(
        (status = 201, description = "Renewal scheduled", body = RenewalView),
        (status = 404, description = "Prior plan not found", body = crate::error::ErrorBody),
        (status = 409, description = "Plan already has a renewal", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid renewal dates", body = crate::error::ErrorBody),
    ),
    tag = "renewals"
)]
pub async fn create_renewal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateRenewalRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RenewalView>), AppError> {
    require_operator(&caller)?;
    let req = extract_validated_json(body)?;
    let prior = SubscriptionPlanId::from_uuid(req.prior_subscription_plan);
    let terms = RenewalTerms {
        salesforce_opportunity_id: SalesforceOpportunityId::new(req.salesforce_opportunity_id)?,
        number_of_licenses: req.number_of_licenses,
        effective_date: req.effective_date,
        renewed_expiration_date: req.renewed_expiration_date,
    };

    let mut registry = state.registry.write();
    let id = registry.add_renewal(&prior, terms, Timestamp::now())?;
    let renewal = registry.renewal(&id)?;
    Ok((StatusCode::CREATED, Json(RenewalView::from(renewal))))
}

/// POST /v1/renewals/{id}/process: Create the renewed plan.
#[utoipa::path(
    post,
    path = "/v1/renewals/{id}/process",
    params(("id" = Uuid, Path, description = "Renewal UUID")),
    responses(
        (status = 200, description = "Renewal processed", body = ProcessRenewalResponse),
        (status = 404, description = "Renewal not found", body = crate::error::ErrorBody),
        (status = 409, description = "Renewal already processed", body = crate::error::ErrorBody),
        (status = 422, description = "Renewal too small for allocated licenses", body = crate::error::ErrorBody),
    ),
    tag = "renewals"
)]
pub async fn process_renewal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<ProcessRenewalResponse>, AppError> {
    require_operator(&caller)?;
    let id = RenewalId::from_uuid(id);

    let mut registry = state.registry.write();
    let renewed = registry.process_renewal(&id, Timestamp::now())?;
    let renewal = registry.renewal(&id)?;
    let plan = registry.subscription_plan(&renewed)?;
    Ok(Json(ProcessRenewalResponse {
        renewal: RenewalView::from(renewal),
        renewed_subscription_plan: PlanView::new(plan, today()),
    }))
}
