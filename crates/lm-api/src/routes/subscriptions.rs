//! # Subscription Plans API
//!
//! Plan creation, listing, expiration processing, and catalog containment
//! checks. License management under a plan lives in
//! [`crate::routes::licenses`].

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use lm_core::constants::DEFAULT_REVOKE_MAX_PERCENTAGE;
use lm_core::{
    CustomerAgreementId, EnterpriseCatalogId, EnterpriseCustomerId, PlanTitle,
    SalesforceOpportunityId, SubscriptionPlanId, Timestamp,
};
use lm_state::PlanTerms;

use crate::auth::{require_learner_or_admin, require_operator, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_query, extract_validated_json, Validate};
use crate::routes::{today, PlanView};
use crate::state::AppState;

fn default_revoke_max_percentage() -> u8 {
    DEFAULT_REVOKE_MAX_PERCENTAGE
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePlanRequest {
    pub customer_agreement_uuid: Uuid,
    pub title: String,
    pub start_date: NaiveDate,
    pub expiration_date: NaiveDate,
    /// Defaults to the agreement's catalog.
    #[serde(default)]
    pub enterprise_catalog_uuid: Option<Uuid>,
    #[serde(default = "default_revoke_max_percentage")]
    pub revoke_max_percentage: u8,
    pub salesforce_opportunity_id: String,
    pub netsuite_product_id: u64,
    #[serde(default)]
    pub for_internal_use_only: bool,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub num_licenses: u64,
}

impl Validate for CreatePlanRequest {
    fn validate(&self) -> Result<(), String> {
        if self.start_date > self.expiration_date {
            return Err("start_date must not be after expiration_date".into());
        }
        if self.revoke_max_percentage > 100 {
            return Err("revoke_max_percentage must be between 0 and 100".into());
        }
        Ok(())
    }
}

impl CreatePlanRequest {
    fn into_terms(self) -> Result<PlanTerms, AppError> {
        Ok(PlanTerms {
            title: PlanTitle::new(self.title)?,
            start_date: self.start_date,
            expiration_date: self.expiration_date,
            enterprise_catalog_uuid: self.enterprise_catalog_uuid.map(EnterpriseCatalogId::from_uuid),
            revoke_max_percentage: self.revoke_max_percentage,
            salesforce_opportunity_id: SalesforceOpportunityId::new(self.salesforce_opportunity_id)?,
            netsuite_product_id: self.netsuite_product_id,
            for_internal_use_only: self.for_internal_use_only,
            is_active: self.is_active,
            num_licenses: self.num_licenses,
        })
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListPlansQuery {
    /// Only plans of this enterprise.
    pub enterprise_customer_uuid: Option<Uuid>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ContainsContentQuery {
    /// Comma-separated content ids.
    pub content_ids: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ContainsContentResponse {
    pub contains_content_items: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExpirationResponse {
    pub subscription_id: Uuid,
    pub num_licenses: usize,
    /// Allocated license ids, batched for downstream processing.
    pub license_batches: Vec<Vec<Uuid>>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/subscriptions", get(list_plans).post(create_plan))
        .route("/v1/subscriptions/{id}", get(get_plan))
        .route("/v1/subscriptions/{id}/expire", post(expire_plan))
        .route("/v1/subscriptions/{id}/contains-content", get(contains_content))
}

/// POST /v1/subscriptions: Create a plan under an agreement.
#[utoipa::path(
    post,
    path = "/v1/subscriptions",
    request_body = CreatePlanRequest,
    responses(
        (status = 201, description = "Plan created", body = PlanView),
        (status = 404, description = "Agreement not found", body = crate::error::ErrorBody),
        (status = 409, description = "Duplicate plan title", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "subscriptions"
)]
pub async fn create_plan(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreatePlanRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PlanView>), AppError> {
    require_operator(&caller)?;
    let req = extract_validated_json(body)?;
    let agreement = CustomerAgreementId::from_uuid(req.customer_agreement_uuid);
    let terms = req.into_terms()?;

    let mut registry = state.registry.write();
    let id = registry.add_subscription_plan(&agreement, terms, Timestamp::now())?;
    let plan = registry.subscription_plan(&id)?;
    tracing::info!(plan = %id, agreement = %agreement, licenses = plan.num_licenses(), "subscription plan created");
    Ok((StatusCode::CREATED, Json(PlanView::new(plan, today()))))
}

/// GET /v1/subscriptions: Plans visible to the caller.
#[utoipa::path(
    get,
    path = "/v1/subscriptions",
    params(ListPlansQuery),
    responses(
        (status = 200, description = "Visible plans", body = Vec<PlanView>),
    ),
    tag = "subscriptions"
)]
pub async fn list_plans(
    State(state): State<AppState>,
    caller: CallerIdentity,
    query: Result<Query<ListPlansQuery>, QueryRejection>,
) -> Result<Json<Vec<PlanView>>, AppError> {
    let query = extract_query(query)?;
    let enterprise = query.enterprise_customer_uuid.map(EnterpriseCustomerId::from_uuid);
    let today = today();
    let registry = state.registry.read();
    let views = registry
        .subscription_plans()
        .filter(|p| enterprise.map_or(true, |e| p.enterprise_customer_uuid == e))
        .filter(|p| caller.has_learner_or_admin_access(&p.enterprise_customer_uuid))
        .map(|p| PlanView::new(p, today))
        .collect();
    Ok(Json(views))
}

/// GET /v1/subscriptions/{id}: One plan.
#[utoipa::path(
    get,
    path = "/v1/subscriptions/{id}",
    params(("id" = Uuid, Path, description = "Subscription plan UUID")),
    responses(
        (status = 200, description = "Plan", body = PlanView),
        (status = 403, description = "No access to the enterprise", body = crate::error::ErrorBody),
        (status = 404, description = "Plan not found", body = crate::error::ErrorBody),
    ),
    tag = "subscriptions"
)]
pub async fn get_plan(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<PlanView>, AppError> {
    let registry = state.registry.read();
    let plan = registry.subscription_plan(&SubscriptionPlanId::from_uuid(id))?;
    require_learner_or_admin(&caller, &plan.enterprise_customer_uuid)?;
    Ok(Json(PlanView::new(plan, today())))
}

/// POST /v1/subscriptions/{id}/expire: Process an expired plan.
#[utoipa::path(
    post,
    path = "/v1/subscriptions/{id}/expire",
    params(("id" = Uuid, Path, description = "Subscription plan UUID")),
    responses(
        (status = 200, description = "Expiration processed", body = ExpirationResponse),
        (status = 404, description = "Plan not found", body = crate::error::ErrorBody),
        (status = 409, description = "Not yet expired or already processed", body = crate::error::ErrorBody),
    ),
    tag = "subscriptions"
)]
pub async fn expire_plan(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<ExpirationResponse>, AppError> {
    require_operator(&caller)?;
    let report = state
        .registry
        .write()
        .expire_subscription(&SubscriptionPlanId::from_uuid(id), today())?;
    Ok(Json(ExpirationResponse {
        subscription_id: *report.subscription_id.as_uuid(),
        num_licenses: report.num_licenses(),
        license_batches: report
            .license_batches
            .iter()
            .map(|batch| batch.iter().map(|l| *l.as_uuid()).collect())
            .collect(),
    }))
}

/// GET /v1/subscriptions/{id}/contains-content: Catalog containment.
///
/// True only when every listed content id is in the plan's catalog.
#[utoipa::path(
    get,
    path = "/v1/subscriptions/{id}/contains-content",
    params(
        ("id" = Uuid, Path, description = "Subscription plan UUID"),
        ContainsContentQuery,
    ),
    responses(
        (status = 200, description = "Containment result", body = ContainsContentResponse),
        (status = 404, description = "Plan not found", body = crate::error::ErrorBody),
        (status = 422, description = "No content ids given", body = crate::error::ErrorBody),
        (status = 502, description = "Catalog service answered unexpectedly", body = crate::error::ErrorBody),
        (status = 503, description = "Catalog service unreachable", body = crate::error::ErrorBody),
    ),
    tag = "subscriptions"
)]
pub async fn contains_content(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    query: Result<Query<ContainsContentQuery>, QueryRejection>,
) -> Result<Json<ContainsContentResponse>, AppError> {
    let query = extract_query(query)?;
    let content_ids: Vec<String> = query
        .content_ids
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect();

    let catalog_id = {
        let registry = state.registry.read();
        let plan = registry.subscription_plan(&SubscriptionPlanId::from_uuid(id))?;
        require_learner_or_admin(&caller, &plan.enterprise_customer_uuid)?;
        plan.enterprise_catalog_uuid
    };

    let catalog = Arc::clone(&state.catalog);
    let contains_content_items = tokio::task::spawn_blocking(move || {
        catalog.contains_content_items(&catalog_id, &content_ids)
    })
    .await
    .map_err(|e| AppError::Internal(format!("catalog lookup task failed: {e}")))??;
    Ok(Json(ContainsContentResponse {
        contains_content_items,
    }))
}
