//! # Customer Agreements API
//!
//! One agreement per enterprise customer. The detail view carries the
//! agreement's plans ordered by expiration, counting scheduled renewals.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use lm_core::{CustomerAgreementId, EnterpriseCatalogId, EnterpriseCustomerId, EnterpriseSlug, Timestamp};
use lm_state::CustomerAgreement;

use crate::auth::{require_learner_or_admin, require_operator, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::routes::{today, AgreementView, ExpirationView, PlanView};
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAgreementRequest {
    pub enterprise_customer_uuid: Uuid,
    pub enterprise_customer_slug: String,
    pub enterprise_customer_name: String,
    #[serde(default)]
    pub default_enterprise_catalog_uuid: Option<Uuid>,
}

impl Validate for CreateAgreementRequest {
    fn validate(&self) -> Result<(), String> {
        if self.enterprise_customer_name.trim().is_empty() {
            return Err("enterprise_customer_name must not be empty".into());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AgreementDetail {
    #[serde(flatten)]
    pub agreement: AgreementView,
    pub subscriptions: Vec<PlanView>,
    pub ordered_subscription_plan_expirations: Vec<ExpirationView>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/customer-agreements",
            get(list_agreements).post(create_agreement),
        )
        .route("/v1/customer-agreements/{id}", get(get_agreement))
}

/// POST /v1/customer-agreements: Register an enterprise customer.
#[utoipa::path(
    post,
    path = "/v1/customer-agreements",
    request_body = CreateAgreementRequest,
    responses(
        (status = 201, description = "Agreement created", body = AgreementView),
        (status = 409, description = "Enterprise or slug already registered", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "agreements"
)]
pub async fn create_agreement(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateAgreementRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AgreementView>), AppError> {
    require_operator(&caller)?;
    let req = extract_validated_json(body)?;
    let agreement = CustomerAgreement::new(
        EnterpriseCustomerId::from_uuid(req.enterprise_customer_uuid),
        EnterpriseSlug::new(req.enterprise_customer_slug)?,
        req.enterprise_customer_name.trim(),
        req.default_enterprise_catalog_uuid
            .map(EnterpriseCatalogId::from_uuid),
        Timestamp::now(),
    );
    let view = AgreementView::from(&agreement);
    state.registry.write().add_customer_agreement(agreement)?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /v1/customer-agreements: Agreements visible to the caller.
#[utoipa::path(
    get,
    path = "/v1/customer-agreements",
    responses(
        (status = 200, description = "Visible agreements", body = Vec<AgreementView>),
    ),
    tag = "agreements"
)]
pub async fn list_agreements(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Json<Vec<AgreementView>> {
    let registry = state.registry.read();
    let views = registry
        .customer_agreements()
        .filter(|a| caller.has_learner_or_admin_access(&a.enterprise_customer_uuid))
        .map(AgreementView::from)
        .collect();
    Json(views)
}

/// GET /v1/customer-agreements/{id}: Agreement with plans and expirations.
#[utoipa::path(
    get,
    path = "/v1/customer-agreements/{id}",
    params(("id" = Uuid, Path, description = "Customer agreement UUID")),
    responses(
        (status = 200, description = "Agreement detail", body = AgreementDetail),
        (status = 403, description = "No access to the enterprise", body = crate::error::ErrorBody),
        (status = 404, description = "Agreement not found", body = crate::error::ErrorBody),
    ),
    tag = "agreements"
)]
pub async fn get_agreement(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<AgreementDetail>, AppError> {
    let id = CustomerAgreementId::from_uuid(id);
    let today = today();
    let registry = state.registry.read();
    let agreement = registry.customer_agreement(&id)?;
    require_learner_or_admin(&caller, &agreement.enterprise_customer_uuid)?;

    let subscriptions = registry
        .plans_for_agreement(&id)
        .map(|p| PlanView::new(p, today))
        .collect();
    let ordered_subscription_plan_expirations = registry
        .ordered_subscription_plan_expirations(&id, today)?
        .iter()
        .map(ExpirationView::from)
        .collect();
    Ok(Json(AgreementDetail {
        agreement: AgreementView::from(agreement),
        subscriptions,
        ordered_subscription_plan_expirations,
    }))
}
