//! # API Route Modules
//!
//! | Prefix                      | Module            |
//! |-----------------------------|-------------------|
//! | `/v1/customer-agreements/*` | [`agreements`]    |
//! | `/v1/subscriptions/*`       | [`subscriptions`], [`licenses`] |
//! | `/v1/licenses/*`            | [`licenses`]      |
//! | `/v1/learner-licenses`      | [`licenses`]      |
//! | `/v1/renewals/*`            | [`renewals`]      |
//! | `/v1/retirements/*`         | [`retirements`]   |
//!
//! Response views below flatten domain newtypes into plain JSON types so
//! the OpenAPI schema stays readable.

pub mod agreements;
pub mod licenses;
pub mod renewals;
pub mod retirements;
pub mod subscriptions;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use lm_core::{EmailAddress, Timestamp};
use lm_state::{
    CustomerAgreement, License, PlanExpiration, SubscriptionPlan, SubscriptionPlanRenewal,
};

use crate::error::AppError;

pub(crate) fn datetime(ts: Timestamp) -> DateTime<Utc> {
    *ts.as_datetime()
}

pub(crate) fn today() -> NaiveDate {
    Timestamp::now().date_naive()
}

pub(crate) fn parse_email(raw: &str) -> Result<EmailAddress, AppError> {
    Ok(EmailAddress::new(raw)?)
}

/// Greeting and closing an admin wraps around activation and reminder mail.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct EmailText {
    #[serde(default)]
    pub greeting: String,
    #[serde(default)]
    pub closing: String,
}

impl From<EmailText> for lm_notify::CustomText {
    fn from(text: EmailText) -> Self {
        Self {
            greeting: text.greeting,
            closing: text.closing,
        }
    }
}

// ─── Views ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AgreementView {
    pub uuid: Uuid,
    pub enterprise_customer_uuid: Uuid,
    pub enterprise_customer_slug: String,
    pub enterprise_customer_name: String,
    pub default_enterprise_catalog_uuid: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<&CustomerAgreement> for AgreementView {
    fn from(a: &CustomerAgreement) -> Self {
        Self {
            uuid: *a.uuid.as_uuid(),
            enterprise_customer_uuid: *a.enterprise_customer_uuid.as_uuid(),
            enterprise_customer_slug: a.enterprise_customer_slug.to_string(),
            enterprise_customer_name: a.enterprise_customer_name.clone(),
            default_enterprise_catalog_uuid: a.default_enterprise_catalog_uuid.map(|c| *c.as_uuid()),
            created_at: datetime(a.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExpirationView {
    pub subscription_id: Uuid,
    pub days_until_expiration: i64,
    pub days_until_expiration_including_renewals: i64,
    pub is_active: bool,
}

impl From<&PlanExpiration> for ExpirationView {
    fn from(e: &PlanExpiration) -> Self {
        Self {
            subscription_id: *e.subscription_id.as_uuid(),
            days_until_expiration: e.days_until_expiration,
            days_until_expiration_including_renewals: e.days_until_expiration_including_renewals,
            is_active: e.is_active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlanView {
    pub uuid: Uuid,
    pub title: String,
    pub start_date: NaiveDate,
    pub expiration_date: NaiveDate,
    pub expiration_processed: bool,
    pub is_active: bool,
    pub is_current: bool,
    pub days_until_expiration: i64,
    pub enterprise_catalog_uuid: Uuid,
    pub customer_agreement: Uuid,
    pub enterprise_customer_uuid: Uuid,
    pub revoke_max_percentage: u8,
    pub num_revocations_applied: u64,
    pub num_revocations_allowed: u64,
    pub num_revocations_remaining: u64,
    pub num_licenses: u64,
    pub num_allocated_licenses: u64,
    pub salesforce_opportunity_id: String,
    pub netsuite_product_id: u64,
    pub for_internal_use_only: bool,
    pub created_at: DateTime<Utc>,
}

impl PlanView {
    pub fn new(plan: &SubscriptionPlan, today: NaiveDate) -> Self {
        Self {
            uuid: *plan.uuid.as_uuid(),
            title: plan.title.to_string(),
            start_date: plan.start_date,
            expiration_date: plan.expiration_date,
            expiration_processed: plan.expiration_processed,
            is_active: plan.is_active,
            is_current: plan.is_current(today),
            days_until_expiration: plan.days_until_expiration(today),
            enterprise_catalog_uuid: *plan.enterprise_catalog_uuid.as_uuid(),
            customer_agreement: *plan.customer_agreement.as_uuid(),
            enterprise_customer_uuid: *plan.enterprise_customer_uuid.as_uuid(),
            revoke_max_percentage: plan.revoke_max_percentage,
            num_revocations_applied: plan.num_revocations_applied,
            num_revocations_allowed: plan.num_revocations_allowed(),
            num_revocations_remaining: plan.num_revocations_remaining(),
            num_licenses: plan.num_licenses(),
            num_allocated_licenses: plan.num_allocated_licenses(),
            salesforce_opportunity_id: plan.salesforce_opportunity_id.to_string(),
            netsuite_product_id: plan.netsuite_product_id,
            for_internal_use_only: plan.for_internal_use_only,
            created_at: datetime(plan.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LicenseView {
    pub uuid: Uuid,
    pub subscription_plan: Uuid,
    pub status: String,
    pub user_email: Option<String>,
    pub lms_user_id: Option<u64>,
    /// Present only when activation keys are exposed over the API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activation_key: Option<Uuid>,
    pub assigned_date: Option<DateTime<Utc>>,
    pub activation_date: Option<DateTime<Utc>>,
    pub last_remind_date: Option<DateTime<Utc>>,
    pub revoked_date: Option<DateTime<Utc>>,
}

impl LicenseView {
    pub fn new(license: &License, expose_activation_key: bool) -> Self {
        Self {
            uuid: *license.uuid.as_uuid(),
            subscription_plan: *license.subscription_plan.as_uuid(),
            status: license.status.to_string(),
            user_email: license.user_email.as_ref().map(ToString::to_string),
            lms_user_id: license.lms_user_id,
            activation_key: license
                .activation_key
                .filter(|_| expose_activation_key)
                .map(|k| *k.as_uuid()),
            assigned_date: license.assigned_date.map(datetime),
            activation_date: license.activation_date.map(datetime),
            last_remind_date: license.last_remind_date.map(datetime),
            revoked_date: license.revoked_date.map(datetime),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RenewalView {
    pub uuid: Uuid,
    pub prior_subscription_plan: Uuid,
    pub renewed_subscription_plan: Option<Uuid>,
    pub salesforce_opportunity_id: String,
    pub number_of_licenses: u64,
    pub effective_date: NaiveDate,
    pub renewed_expiration_date: NaiveDate,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&SubscriptionPlanRenewal> for RenewalView {
    fn from(r: &SubscriptionPlanRenewal) -> Self {
        Self {
            uuid: *r.uuid.as_uuid(),
            prior_subscription_plan: *r.prior_subscription_plan.as_uuid(),
            renewed_subscription_plan: r.renewed_subscription_plan.map(|p| *p.as_uuid()),
            salesforce_opportunity_id: r.salesforce_opportunity_id.to_string(),
            number_of_licenses: r.number_of_licenses,
            effective_date: r.effective_date,
            renewed_expiration_date: r.renewed_expiration_date,
            processed: r.processed,
            created_at: datetime(r.created_at),
        }
    }
}
