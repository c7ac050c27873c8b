//! # Subscription Plan Renewal
//!
//! A scheduled purchase that continues a plan into a new term. Processing a
//! renewal (see [`crate::registry::SubscriptionRegistry::process_renewal`])
//! creates the renewed plan and links it back here.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lm_core::constants::MAX_NUM_LICENSES;
use lm_core::{PlanTitle, RenewalId, SalesforceOpportunityId, SubscriptionPlanId, Timestamp};

use crate::plan::SubscriptionPlan;

/// Renewal validation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenewalError {
    /// The renewal would take effect before the prior plan started.
    #[error("effective date {effective} precedes prior plan start {prior_start}")]
    EffectiveBeforePriorStart {
        effective: NaiveDate,
        prior_start: NaiveDate,
    },

    /// The renewed term would end on or before it begins.
    #[error("renewed expiration {expiration} must be after effective date {effective}")]
    ExpirationNotAfterEffective {
        effective: NaiveDate,
        expiration: NaiveDate,
    },

    #[error("a renewal may carry at most {max} licenses, {requested} requested")]
    TooManyLicenses { requested: u64, max: u64 },
}

/// Terms of a renewal as requested by an operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewalTerms {
    pub salesforce_opportunity_id: SalesforceOpportunityId,
    pub number_of_licenses: u64,
    pub effective_date: NaiveDate,
    pub renewed_expiration_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPlanRenewal {
    pub uuid: RenewalId,
    pub prior_subscription_plan: SubscriptionPlanId,
    /// Title of the prior plan, kept for display.
    pub prior_subscription_plan_title: PlanTitle,
    /// Set once the renewal is processed.
    pub renewed_subscription_plan: Option<SubscriptionPlanId>,
    pub salesforce_opportunity_id: SalesforceOpportunityId,
    pub number_of_licenses: u64,
    pub effective_date: NaiveDate,
    pub renewed_expiration_date: NaiveDate,
    pub processed: bool,
    pub created_at: Timestamp,
}

impl SubscriptionPlanRenewal {
    /// Validate `terms` against the prior plan and build an unprocessed
    /// renewal.
    pub fn new(
        terms: RenewalTerms,
        prior: &SubscriptionPlan,
        now: Timestamp,
    ) -> Result<Self, RenewalError> {
        if terms.effective_date < prior.start_date {
            return Err(RenewalError::EffectiveBeforePriorStart {
                effective: terms.effective_date,
                prior_start: prior.start_date,
            });
        }
        if terms.renewed_expiration_date <= terms.effective_date {
            return Err(RenewalError::ExpirationNotAfterEffective {
                effective: terms.effective_date,
                expiration: terms.renewed_expiration_date,
            });
        }
        if terms.number_of_licenses > MAX_NUM_LICENSES {
            return Err(RenewalError::TooManyLicenses {
                requested: terms.number_of_licenses,
                max: MAX_NUM_LICENSES,
            });
        }
        Ok(Self {
            uuid: RenewalId::new(),
            prior_subscription_plan: prior.uuid,
            prior_subscription_plan_title: prior.title.clone(),
            renewed_subscription_plan: None,
            salesforce_opportunity_id: terms.salesforce_opportunity_id,
            number_of_licenses: terms.number_of_licenses,
            effective_date: terms.effective_date,
            renewed_expiration_date: terms.renewed_expiration_date,
            processed: false,
            created_at: now,
        })
    }
}

impl std::fmt::Display for SubscriptionPlanRenewal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<SubscriptionPlanRenewal with id '{}' for subscription with title '{}' and UUID '{}' effective on '{}'>",
            self.uuid, self.prior_subscription_plan_title, self.prior_subscription_plan, self.effective_date
        )
    }
}
