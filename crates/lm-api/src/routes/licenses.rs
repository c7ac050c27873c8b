//! # Licenses API
//!
//! Admin operations on the licenses of one plan (listing, assignment,
//! reminders, revocation, growth), learner activation, and the learner's
//! view of their own licenses.
//!
//! Notifications are composed while the registry lock is held and handed
//! to the mailer after it is released.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use lm_core::constants::{LICENSE_DISCOUNT_VALUE, PERCENTAGE_DISCOUNT_TYPE};
use lm_core::{ActivationKey, EmailAddress, SubscriptionPlanId, Timestamp};
use lm_notify::{
    activation_emails, onboarding_email, reminder_emails, revocation_cap_email, CustomText,
    Notification,
};
use lm_state::{License, LicenseStatus, StatusOverview, SubscriptionPlan, SubscriptionRegistry};

use crate::auth::{require_admin, require_learner_or_admin, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_query, extract_validated_json, Validate};
use crate::routes::{parse_email, today, EmailText, LicenseView, PlanView};
use crate::state::AppState;

// ─── Requests ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, IntoParams)]
pub struct LicenseListQuery {
    /// `unassigned`, `assigned`, `activated`, or `revoked`.
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct IncreaseLicensesRequest {
    pub num_licenses: u64,
}

impl Validate for IncreaseLicensesRequest {
    fn validate(&self) -> Result<(), String> {
        if self.num_licenses == 0 {
            return Err("num_licenses must be positive".into());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignLicensesRequest {
    pub user_emails: Vec<String>,
    #[serde(flatten)]
    pub text: EmailText,
}

impl Validate for AssignLicensesRequest {
    fn validate(&self) -> Result<(), String> {
        if self.user_emails.is_empty() {
            return Err("user_emails must not be empty".into());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RemindRequest {
    pub user_email: String,
    #[serde(flatten)]
    pub text: EmailText,
}

impl Validate for RemindRequest {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RemindAllRequest {
    #[serde(flatten)]
    pub text: EmailText,
}

impl Validate for RemindAllRequest {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RevokeRequest {
    pub user_email: String,
}

impl Validate for RevokeRequest {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ActivateRequest {
    pub activation_key: Uuid,
    pub lms_user_id: u64,
}

impl Validate for ActivateRequest {
    fn validate(&self) -> Result<(), String> {
        if self.lms_user_id == 0 {
            return Err("lms_user_id must be positive".into());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct LearnerLicensesQuery {
    pub email: String,
}

// ─── Responses ───────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusCount {
    pub status: String,
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AssignResponse {
    pub num_assigned: usize,
    pub licenses: Vec<LicenseView>,
    pub num_notifications: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RemindResponse {
    pub num_reminded: usize,
    pub num_notifications: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RevokeResponse {
    pub revoked_license: Uuid,
    pub previous_status: String,
    pub replacement_license: Uuid,
    pub counted_against_cap: bool,
    pub num_revocations_applied: u64,
    pub num_revocations_remaining: u64,
    /// Whether customer support was notified that the cap is used up.
    pub revocation_cap_notified: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActivateResponse {
    pub subscription_uuid: Uuid,
    pub license: LicenseView,
    /// False when the license was already active for this learner.
    pub newly_activated: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubsidyView {
    pub discount_type: String,
    pub discount_value: u8,
    pub starts: NaiveDate,
    pub expires: NaiveDate,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LearnerLicenseView {
    pub license: LicenseView,
    pub subscription_plan: PlanView,
    pub enterprise_customer_uuid: Uuid,
    pub enterprise_customer_slug: String,
    /// Present for activated licenses only.
    pub subsidy: Option<SubsidyView>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/subscriptions/{id}/licenses", get(list_licenses))
        .route("/v1/subscriptions/{id}/licenses/overview", get(license_overview))
        .route("/v1/subscriptions/{id}/licenses/increase", post(increase_licenses))
        .route("/v1/subscriptions/{id}/licenses/assign", post(assign_licenses))
        .route("/v1/subscriptions/{id}/licenses/remind", post(remind))
        .route("/v1/subscriptions/{id}/licenses/remind-all", post(remind_all))
        .route("/v1/subscriptions/{id}/licenses/revoke", post(revoke))
        .route("/v1/licenses/activate", post(activate))
        .route("/v1/learner-licenses", get(learner_licenses))
}

// ─── Helpers ─────────────────────────────────────────────────────────

/// Resolve a plan and check the caller administers its enterprise.
fn admin_plan<'a>(
    registry: &'a SubscriptionRegistry,
    caller: &CallerIdentity,
    id: &SubscriptionPlanId,
) -> Result<&'a SubscriptionPlan, AppError> {
    let plan = registry.subscription_plan(id)?;
    require_admin(caller, &plan.enterprise_customer_uuid)?;
    Ok(plan)
}

fn licenses_by_id<'a>(plan: &'a SubscriptionPlan, ids: &[lm_core::LicenseId]) -> Vec<&'a License> {
    ids.iter().filter_map(|id| plan.license(id)).collect()
}

fn deliver(state: &AppState, notifications: Vec<Notification>) -> Result<usize, AppError> {
    Ok(state.mailer.send_all(notifications)?)
}

// ─── Admin handlers ──────────────────────────────────────────────────

/// GET /v1/subscriptions/{id}/licenses: Licenses of a plan.
#[utoipa::path(
    get,
    path = "/v1/subscriptions/{id}/licenses",
    params(("id" = Uuid, Path, description = "Subscription plan UUID"), LicenseListQuery),
    responses(
        (status = 200, description = "Licenses", body = Vec<LicenseView>),
        (status = 403, description = "Admin access required", body = crate::error::ErrorBody),
        (status = 422, description = "Unknown status", body = crate::error::ErrorBody),
    ),
    tag = "licenses"
)]
pub async fn list_licenses(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    query: Result<Query<LicenseListQuery>, QueryRejection>,
) -> Result<Json<Vec<LicenseView>>, AppError> {
    let query = extract_query(query)?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<LicenseStatus>)
        .transpose()?;
    let expose = state.config.expose_activation_keys;

    let registry = state.registry.read();
    let plan = admin_plan(&registry, &caller, &SubscriptionPlanId::from_uuid(id))?;
    let views = plan
        .licenses()
        .filter(|l| status.map_or(true, |s| l.status == s))
        .map(|l| LicenseView::new(l, expose))
        .collect();
    Ok(Json(views))
}

/// GET /v1/subscriptions/{id}/licenses/overview: Counts per status.
#[utoipa::path(
    get,
    path = "/v1/subscriptions/{id}/licenses/overview",
    params(("id" = Uuid, Path, description = "Subscription plan UUID")),
    responses(
        (status = 200, description = "License counts", body = Vec<StatusCount>),
    ),
    tag = "licenses"
)]
pub async fn license_overview(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<StatusCount>>, AppError> {
    let registry = state.registry.read();
    let plan = admin_plan(&registry, &caller, &SubscriptionPlanId::from_uuid(id))?;
    let StatusOverview {
        activated,
        assigned,
        unassigned,
        revoked,
    } = plan.status_overview();
    let counts = [
        (LicenseStatus::Activated, activated),
        (LicenseStatus::Assigned, assigned),
        (LicenseStatus::Unassigned, unassigned),
        (LicenseStatus::Revoked, revoked),
    ]
    .into_iter()
    .filter(|(_, count)| *count > 0)
    .map(|(status, count)| StatusCount {
        status: status.to_string(),
        count,
    })
    .collect();
    Ok(Json(counts))
}

/// POST /v1/subscriptions/{id}/licenses/increase: Add unassigned licenses.
#[utoipa::path(
    post,
    path = "/v1/subscriptions/{id}/licenses/increase",
    params(("id" = Uuid, Path, description = "Subscription plan UUID")),
    request_body = IncreaseLicensesRequest,
    responses(
        (status = 200, description = "Updated plan", body = PlanView),
        (status = 422, description = "Too many licenses", body = crate::error::ErrorBody),
    ),
    tag = "licenses"
)]
pub async fn increase_licenses(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<IncreaseLicensesRequest>, JsonRejection>,
) -> Result<Json<PlanView>, AppError> {
    let req = extract_validated_json(body)?;
    let id = SubscriptionPlanId::from_uuid(id);
    let mut registry = state.registry.write();
    admin_plan(&registry, &caller, &id)?;
    let plan = registry.subscription_plan_mut(&id)?;
    let created = plan.increase_num_licenses(req.num_licenses, Timestamp::now())?;
    tracing::info!(plan = %id, added = created.len(), "licenses added");
    Ok(Json(PlanView::new(plan, today())))
}

/// POST /v1/subscriptions/{id}/licenses/assign: Assign and send activation mail.
#[utoipa::path(
    post,
    path = "/v1/subscriptions/{id}/licenses/assign",
    params(("id" = Uuid, Path, description = "Subscription plan UUID")),
    request_body = AssignLicensesRequest,
    responses(
        (status = 200, description = "Licenses assigned", body = AssignResponse),
        (status = 409, description = "Email already holds a license", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid email or not enough licenses", body = crate::error::ErrorBody),
    ),
    tag = "licenses"
)]
pub async fn assign_licenses(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<AssignLicensesRequest>, JsonRejection>,
) -> Result<Json<AssignResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let emails = req
        .user_emails
        .iter()
        .map(|e| parse_email(e))
        .collect::<Result<Vec<EmailAddress>, _>>()?;
    let custom: CustomText = req.text.into();
    let id = SubscriptionPlanId::from_uuid(id);
    let expose = state.config.expose_activation_keys;

    let (licenses, notifications) = {
        let mut registry = state.registry.write();
        admin_plan(&registry, &caller, &id)?;
        let assigned = registry
            .subscription_plan_mut(&id)?
            .assign_licenses(&emails, Timestamp::now())?;
        let plan = registry.subscription_plan(&id)?;
        let agreement = registry.customer_agreement(&plan.customer_agreement)?;
        let targets = licenses_by_id(plan, &assigned);
        let notifications =
            activation_emails(&custom, &targets, plan, agreement, &state.config.portal)?;
        let views: Vec<LicenseView> = targets.iter().map(|l| LicenseView::new(l, expose)).collect();
        (views, notifications)
    };

    let num_notifications = deliver(&state, notifications)?;
    Ok(Json(AssignResponse {
        num_assigned: licenses.len(),
        licenses,
        num_notifications,
    }))
}

/// POST /v1/subscriptions/{id}/licenses/remind: Re-send one activation mail.
#[utoipa::path(
    post,
    path = "/v1/subscriptions/{id}/licenses/remind",
    params(("id" = Uuid, Path, description = "Subscription plan UUID")),
    request_body = RemindRequest,
    responses(
        (status = 200, description = "Reminder sent", body = RemindResponse),
        (status = 404, description = "No license for the email", body = crate::error::ErrorBody),
        (status = 409, description = "License is not pending activation", body = crate::error::ErrorBody),
    ),
    tag = "licenses"
)]
pub async fn remind(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<RemindRequest>, JsonRejection>,
) -> Result<Json<RemindResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let email = parse_email(&req.user_email)?;
    let custom: CustomText = req.text.into();
    let id = SubscriptionPlanId::from_uuid(id);

    let notifications = {
        let mut registry = state.registry.write();
        admin_plan(&registry, &caller, &id)?;
        let reminded = registry
            .subscription_plan_mut(&id)?
            .remind(&email, Timestamp::now())?;
        let plan = registry.subscription_plan(&id)?;
        let agreement = registry.customer_agreement(&plan.customer_agreement)?;
        reminder_emails(
            &custom,
            &licenses_by_id(plan, &[reminded]),
            plan,
            agreement,
            &state.config.portal,
        )?
    };

    let num_notifications = deliver(&state, notifications)?;
    Ok(Json(RemindResponse {
        num_reminded: 1,
        num_notifications,
    }))
}

/// POST /v1/subscriptions/{id}/licenses/remind-all: Remind every pending learner.
#[utoipa::path(
    post,
    path = "/v1/subscriptions/{id}/licenses/remind-all",
    params(("id" = Uuid, Path, description = "Subscription plan UUID")),
    request_body = RemindAllRequest,
    responses(
        (status = 200, description = "Reminders sent", body = RemindResponse),
    ),
    tag = "licenses"
)]
pub async fn remind_all(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<RemindAllRequest>, JsonRejection>,
) -> Result<Json<RemindResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let custom: CustomText = req.text.into();
    let id = SubscriptionPlanId::from_uuid(id);

    let (num_reminded, notifications) = {
        let mut registry = state.registry.write();
        admin_plan(&registry, &caller, &id)?;
        let reminded = registry
            .subscription_plan_mut(&id)?
            .remind_all(Timestamp::now());
        let plan = registry.subscription_plan(&id)?;
        let agreement = registry.customer_agreement(&plan.customer_agreement)?;
        let notifications = reminder_emails(
            &custom,
            &licenses_by_id(plan, &reminded),
            plan,
            agreement,
            &state.config.portal,
        )?;
        (reminded.len(), notifications)
    };

    let num_notifications = deliver(&state, notifications)?;
    Ok(Json(RemindResponse {
        num_reminded,
        num_notifications,
    }))
}

/// POST /v1/subscriptions/{id}/licenses/revoke: Revoke a learner's license.
///
/// Notifies customer support when the revocation uses the plan's last
/// allowed revocation.
#[utoipa::path(
    post,
    path = "/v1/subscriptions/{id}/licenses/revoke",
    params(("id" = Uuid, Path, description = "Subscription plan UUID")),
    request_body = RevokeRequest,
    responses(
        (status = 200, description = "License revoked", body = RevokeResponse),
        (status = 404, description = "No license for the email", body = crate::error::ErrorBody),
        (status = 409, description = "Revocation cap reached", body = crate::error::ErrorBody),
    ),
    tag = "licenses"
)]
pub async fn revoke(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<RevokeRequest>, JsonRejection>,
) -> Result<Json<RevokeResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let email = parse_email(&req.user_email)?;
    let id = SubscriptionPlanId::from_uuid(id);
    let now = Timestamp::now();

    let (response, notifications) = {
        let mut registry = state.registry.write();
        admin_plan(&registry, &caller, &id)?;
        let outcome = registry.subscription_plan_mut(&id)?.revoke_license(&email, now)?;
        let plan = registry.subscription_plan(&id)?;
        let mut notifications = Vec::new();
        if outcome.cap_exhausted {
            let agreement = registry.customer_agreement(&plan.customer_agreement)?;
            notifications.push(revocation_cap_email(plan, agreement, &state.config.portal, now));
        }
        let response = RevokeResponse {
            revoked_license: *outcome.revoked_license.as_uuid(),
            previous_status: outcome.previous_status.to_string(),
            replacement_license: *outcome.replacement_license.as_uuid(),
            counted_against_cap: outcome.counted_against_cap,
            num_revocations_applied: plan.num_revocations_applied,
            num_revocations_remaining: plan.num_revocations_remaining(),
            revocation_cap_notified: outcome.cap_exhausted,
        };
        (response, notifications)
    };

    if response.revocation_cap_notified {
        tracing::warn!(plan = %id, "revocation cap reached");
    }
    deliver(&state, notifications)?;
    Ok(Json(response))
}

// ─── Learner handlers ────────────────────────────────────────────────

/// POST /v1/licenses/activate: Activate a license with its activation key.
///
/// Sends the onboarding mail on first activation only.
#[utoipa::path(
    post,
    path = "/v1/licenses/activate",
    request_body = ActivateRequest,
    responses(
        (status = 200, description = "License activated", body = ActivateResponse),
        (status = 404, description = "Unknown activation key", body = crate::error::ErrorBody),
        (status = 409, description = "License cannot be activated", body = crate::error::ErrorBody),
    ),
    tag = "licenses"
)]
pub async fn activate(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<ActivateRequest>, JsonRejection>,
) -> Result<Json<ActivateResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let key = ActivationKey::from_uuid(req.activation_key);
    let expose = state.config.expose_activation_keys;

    let (response, notifications) = {
        let mut registry = state.registry.write();
        let holder = registry.plan_for_activation_key(&key)?;
        let enterprise = holder.enterprise_customer_uuid;
        let previous_status = holder
            .license_by_activation_key(&key)
            .map(|l| l.status)
            .ok_or_else(|| AppError::NotFound(format!("no license matches activation key {key}")))?;
        require_learner_or_admin(&caller, &enterprise)?;

        let (plan_id, license_id) = registry.activate_license(&key, req.lms_user_id, Timestamp::now())?;
        let plan = registry.subscription_plan(&plan_id)?;
        let license = plan
            .license(&license_id)
            .ok_or_else(|| AppError::Internal(format!("license {license_id} vanished after activation")))?;

        let newly_activated = previous_status != LicenseStatus::Activated;
        let mut notifications = Vec::new();
        if newly_activated {
            if let Some(email) = license.user_email.clone() {
                let agreement = registry.customer_agreement(&plan.customer_agreement)?;
                notifications.push(onboarding_email(email, agreement, &state.config.portal));
            }
        }
        let response = ActivateResponse {
            subscription_uuid: *plan_id.as_uuid(),
            license: LicenseView::new(license, expose),
            newly_activated,
        };
        (response, notifications)
    };

    deliver(&state, notifications)?;
    Ok(Json(response))
}

/// GET /v1/learner-licenses: Licenses held by a learner email.
#[utoipa::path(
    get,
    path = "/v1/learner-licenses",
    params(LearnerLicensesQuery),
    responses(
        (status = 200, description = "Learner licenses", body = Vec<LearnerLicenseView>),
        (status = 422, description = "Invalid email", body = crate::error::ErrorBody),
    ),
    tag = "licenses"
)]
pub async fn learner_licenses(
    State(state): State<AppState>,
    caller: CallerIdentity,
    query: Result<Query<LearnerLicensesQuery>, QueryRejection>,
) -> Result<Json<Vec<LearnerLicenseView>>, AppError> {
    let query = extract_query(query)?;
    let email = parse_email(&query.email)?;
    let expose = state.config.expose_activation_keys;
    let today = today();

    let registry = state.registry.read();
    let views = registry
        .licenses_by_user_email(&email)
        .into_iter()
        .filter(|held| caller.has_learner_or_admin_access(&held.agreement.enterprise_customer_uuid))
        .map(|held| LearnerLicenseView {
            license: LicenseView::new(held.license, expose),
            subscription_plan: PlanView::new(held.plan, today),
            enterprise_customer_uuid: *held.agreement.enterprise_customer_uuid.as_uuid(),
            enterprise_customer_slug: held.agreement.enterprise_customer_slug.to_string(),
            subsidy: (held.license.status == LicenseStatus::Activated).then(|| SubsidyView {
                discount_type: PERCENTAGE_DISCOUNT_TYPE.to_string(),
                discount_value: LICENSE_DISCOUNT_VALUE,
                starts: held.plan.start_date,
                expires: held.plan.expiration_date,
            }),
        })
        .collect();
    Ok(Json(views))
}
