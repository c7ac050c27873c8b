//! # Subscription Registry
//!
//! The in-memory store of record for agreements, plans, and renewals, and
//! the home of every operation that spans more than one plan: renewal
//! chains, renewal processing, expiration, learner lookups across
//! enterprises, and user retirement.
//!
//! ## Renewal chains
//!
//! ```text
//! plan A ──renewal r1──▶ plan B ──renewal r2──▶ (unprocessed)
//! ```
//!
//! `future_renewals(A)` yields `[r1, r2]`: it follows `renewed_subscription_plan`
//! links forward and stops at the first renewal that has not been processed
//! (or on a cycle).

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lm_core::constants::{DAYS_TO_RETIRE, LICENSE_EXPIRATION_BATCH_SIZE};
use lm_core::{
    chunks, days_until, ActivationKey, CustomerAgreementId, EmailAddress, EnterpriseCustomerId,
    EnterpriseSlug, LicenseId, PlanTitle, RenewalId, SubscriptionPlanId, Timestamp,
    ValidationError,
};

use crate::agreement::{order_expirations, CustomerAgreement, PlanExpiration};
use crate::license::{License, LicenseStatus};
use crate::plan::{PlanError, PlanTerms, SubscriptionPlan};
use crate::renewal::{RenewalError, RenewalTerms, SubscriptionPlanRenewal};

// ─── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("customer agreement {0} not found")]
    AgreementNotFound(CustomerAgreementId),

    #[error("subscription plan {0} not found")]
    PlanNotFound(SubscriptionPlanId),

    #[error("renewal {0} not found")]
    RenewalNotFound(RenewalId),

    #[error("enterprise {0} already has a customer agreement")]
    DuplicateEnterprise(EnterpriseCustomerId),

    #[error("enterprise slug {0} is already in use")]
    DuplicateSlug(EnterpriseSlug),

    #[error("customer agreement {agreement} already has a plan titled {title:?}")]
    DuplicatePlanTitle {
        agreement: CustomerAgreementId,
        title: String,
    },

    /// A plan is the prior plan of at most one renewal.
    #[error("subscription plan {0} already has a renewal")]
    DuplicateRenewal(SubscriptionPlanId),

    #[error("renewal {0} has already been processed")]
    RenewalAlreadyProcessed(RenewalId),

    /// The renewal is too small for the learners it must carry over.
    #[error("renewal provides {capacity} licenses but {allocated} are allocated")]
    RenewalCapacity { allocated: u64, capacity: u64 },

    #[error("subscription plan {plan} does not expire until {expiration_date}")]
    NotYetExpired {
        plan: SubscriptionPlanId,
        expiration_date: NaiveDate,
    },

    #[error("expiration of subscription plan {0} has already been processed")]
    ExpirationAlreadyProcessed(SubscriptionPlanId),

    #[error("no license matches activation key {0}")]
    UnknownActivationKey(ActivationKey),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Renewal(#[from] RenewalError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

// ─── Views ───────────────────────────────────────────────────────────

/// A learner's license together with the plan and agreement it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct LearnerLicense<'a> {
    pub agreement: &'a CustomerAgreement,
    pub plan: &'a SubscriptionPlan,
    pub license: &'a License,
}

/// Outcome of expiring a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpirationReport {
    pub subscription_id: SubscriptionPlanId,
    /// Allocated license ids at expiration, in batches for downstream
    /// enrollment processing.
    pub license_batches: Vec<Vec<LicenseId>>,
}

impl ExpirationReport {
    pub fn num_licenses(&self) -> usize {
        self.license_batches.iter().map(Vec::len).sum()
    }
}

// ─── Registry ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscriptionRegistry {
    agreements: BTreeMap<CustomerAgreementId, CustomerAgreement>,
    plans: BTreeMap<SubscriptionPlanId, SubscriptionPlan>,
    renewals: BTreeMap<RenewalId, SubscriptionPlanRenewal>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Agreements ───────────────────────────────────────────────────

    /// Register an agreement. Enterprise uuid and slug must both be unused.
    pub fn add_customer_agreement(
        &mut self,
        agreement: CustomerAgreement,
    ) -> Result<CustomerAgreementId, RegistryError> {
        for existing in self.agreements.values() {
            if existing.enterprise_customer_uuid == agreement.enterprise_customer_uuid {
                return Err(RegistryError::DuplicateEnterprise(
                    agreement.enterprise_customer_uuid,
                ));
            }
            if existing.enterprise_customer_slug == agreement.enterprise_customer_slug {
                return Err(RegistryError::DuplicateSlug(
                    agreement.enterprise_customer_slug,
                ));
            }
        }
        let id = agreement.uuid;
        tracing::info!(agreement = %id, slug = %agreement.enterprise_customer_slug, "customer agreement added");
        self.agreements.insert(id, agreement);
        Ok(id)
    }

    pub fn customer_agreement(
        &self,
        id: &CustomerAgreementId,
    ) -> Result<&CustomerAgreement, RegistryError> {
        self.agreements
            .get(id)
            .ok_or(RegistryError::AgreementNotFound(*id))
    }

    pub fn customer_agreements(&self) -> impl Iterator<Item = &CustomerAgreement> {
        self.agreements.values()
    }

    pub fn agreement_for_enterprise(
        &self,
        enterprise: &EnterpriseCustomerId,
    ) -> Option<&CustomerAgreement> {
        self.agreements
            .values()
            .find(|a| &a.enterprise_customer_uuid == enterprise)
    }

    pub fn agreement_by_slug(&self, slug: &EnterpriseSlug) -> Option<&CustomerAgreement> {
        self.agreements
            .values()
            .find(|a| &a.enterprise_customer_slug == slug)
    }

    // ── Plans ────────────────────────────────────────────────────────

    /// Create a plan under an agreement. Titles are unique per agreement.
    pub fn add_subscription_plan(
        &mut self,
        agreement_id: &CustomerAgreementId,
        terms: PlanTerms,
        now: Timestamp,
    ) -> Result<SubscriptionPlanId, RegistryError> {
        let agreement = self.customer_agreement(agreement_id)?;
        self.ensure_title_free(agreement_id, &terms.title)?;
        let plan = SubscriptionPlan::new(terms, agreement, now)?;
        let id = plan.uuid;
        tracing::info!(plan = %id, agreement = %agreement_id, licenses = plan.num_licenses(), "subscription plan added");
        self.plans.insert(id, plan);
        Ok(id)
    }

    pub fn subscription_plan(
        &self,
        id: &SubscriptionPlanId,
    ) -> Result<&SubscriptionPlan, RegistryError> {
        self.plans.get(id).ok_or(RegistryError::PlanNotFound(*id))
    }

    pub fn subscription_plan_mut(
        &mut self,
        id: &SubscriptionPlanId,
    ) -> Result<&mut SubscriptionPlan, RegistryError> {
        self.plans.get_mut(id).ok_or(RegistryError::PlanNotFound(*id))
    }

    pub fn subscription_plans(&self) -> impl Iterator<Item = &SubscriptionPlan> {
        self.plans.values()
    }

    pub fn plans_for_agreement<'a>(
        &'a self,
        agreement: &'a CustomerAgreementId,
    ) -> impl Iterator<Item = &'a SubscriptionPlan> + 'a {
        self.plans
            .values()
            .filter(move |p| &p.customer_agreement == agreement)
    }

    pub fn plans_for_enterprise<'a>(
        &'a self,
        enterprise: &'a EnterpriseCustomerId,
    ) -> impl Iterator<Item = &'a SubscriptionPlan> + 'a {
        self.plans
            .values()
            .filter(move |p| &p.enterprise_customer_uuid == enterprise)
    }

    /// Plans that have reached expiration but have not been processed.
    pub fn plans_pending_expiration(&self, today: NaiveDate) -> Vec<&SubscriptionPlan> {
        self.plans
            .values()
            .filter(|p| p.is_expired(today) && !p.expiration_processed)
            .collect()
    }

    fn ensure_title_free(
        &self,
        agreement: &CustomerAgreementId,
        title: &PlanTitle,
    ) -> Result<(), RegistryError> {
        if self.plans_for_agreement(agreement).any(|p| &p.title == title) {
            return Err(RegistryError::DuplicatePlanTitle {
                agreement: *agreement,
                title: title.to_string(),
            });
        }
        Ok(())
    }

    // ── Renewals ─────────────────────────────────────────────────────

    /// Schedule a renewal of `prior`.
    pub fn add_renewal(
        &mut self,
        prior: &SubscriptionPlanId,
        terms: RenewalTerms,
        now: Timestamp,
    ) -> Result<RenewalId, RegistryError> {
        let plan = self.subscription_plan(prior)?;
        if self.renewal_for_plan(prior).is_some() {
            return Err(RegistryError::DuplicateRenewal(*prior));
        }
        let renewal = SubscriptionPlanRenewal::new(terms, plan, now)?;
        let id = renewal.uuid;
        tracing::info!(renewal = %id, prior = %prior, "renewal scheduled");
        self.renewals.insert(id, renewal);
        Ok(id)
    }

    pub fn renewal(&self, id: &RenewalId) -> Result<&SubscriptionPlanRenewal, RegistryError> {
        self.renewals
            .get(id)
            .ok_or(RegistryError::RenewalNotFound(*id))
    }

    pub fn renewals(&self) -> impl Iterator<Item = &SubscriptionPlanRenewal> {
        self.renewals.values()
    }

    /// The renewal that continues `plan`, if one is scheduled.
    pub fn renewal_for_plan(&self, plan: &SubscriptionPlanId) -> Option<&SubscriptionPlanRenewal> {
        self.renewals
            .values()
            .find(|r| &r.prior_subscription_plan == plan)
    }

    /// Renewals that continue `plan`, nearest first.
    pub fn future_renewals(&self, plan: &SubscriptionPlanId) -> Vec<&SubscriptionPlanRenewal> {
        let mut chain = Vec::new();
        let mut visited = BTreeSet::new();
        let mut current = self.renewal_for_plan(plan);
        while let Some(renewal) = current {
            if !visited.insert(renewal.uuid) {
                break;
            }
            chain.push(renewal);
            current = renewal
                .renewed_subscription_plan
                .and_then(|next| self.renewal_for_plan(&next));
        }
        chain
    }

    /// Days until `plan` expires, counting scheduled renewals.
    pub fn days_until_expiration_including_renewals(
        &self,
        plan: &SubscriptionPlanId,
        today: NaiveDate,
    ) -> Result<i64, RegistryError> {
        let subscription = self.subscription_plan(plan)?;
        let latest = self
            .future_renewals(plan)
            .iter()
            .map(|r| r.renewed_expiration_date)
            .max();
        Ok(match latest {
            Some(date) => days_until(date, today),
            None => subscription.days_until_expiration(today),
        })
    }

    /// Expiration summaries for every plan of an agreement, active plans
    /// first and the furthest expiration leading.
    pub fn ordered_subscription_plan_expirations(
        &self,
        agreement: &CustomerAgreementId,
        today: NaiveDate,
    ) -> Result<Vec<PlanExpiration>, RegistryError> {
        self.customer_agreement(agreement)?;
        let mut expirations = Vec::new();
        for plan in self.plans_for_agreement(agreement) {
            expirations.push(PlanExpiration {
                subscription_id: plan.uuid,
                days_until_expiration: plan.days_until_expiration(today),
                days_until_expiration_including_renewals: self
                    .days_until_expiration_including_renewals(&plan.uuid, today)?,
                is_active: plan.is_active,
            });
        }
        Ok(order_expirations(expirations))
    }

    /// Put a renewal into effect.
    ///
    /// Creates the renewed plan, carries every allocated license over with
    /// its learner binding and activation key, deactivates the prior plan,
    /// and activates the new one.
    pub fn process_renewal(
        &mut self,
        renewal_id: &RenewalId,
        now: Timestamp,
    ) -> Result<SubscriptionPlanId, RegistryError> {
        let renewal = self.renewal(renewal_id)?.clone();
        if renewal.processed {
            return Err(RegistryError::RenewalAlreadyProcessed(*renewal_id));
        }
        let prior = self.subscription_plan(&renewal.prior_subscription_plan)?;
        let agreement = self.customer_agreement(&prior.customer_agreement)?;

        let carried: Vec<License> = prior.licenses().filter(|l| l.is_allocated()).cloned().collect();
        let allocated = carried.len() as u64;
        if allocated > renewal.number_of_licenses {
            return Err(RegistryError::RenewalCapacity {
                allocated,
                capacity: renewal.number_of_licenses,
            });
        }

        let title = PlanTitle::new(format!("{} - Renewal", prior.title))?;
        self.ensure_title_free(&prior.customer_agreement, &title)?;
        let terms = PlanTerms {
            title,
            start_date: renewal.effective_date,
            expiration_date: renewal.renewed_expiration_date,
            enterprise_catalog_uuid: Some(prior.enterprise_catalog_uuid),
            revoke_max_percentage: prior.revoke_max_percentage,
            salesforce_opportunity_id: renewal.salesforce_opportunity_id.clone(),
            netsuite_product_id: prior.netsuite_product_id,
            for_internal_use_only: prior.for_internal_use_only,
            is_active: true,
            num_licenses: renewal.number_of_licenses - allocated,
        };
        let mut renewed = SubscriptionPlan::new(terms, agreement, now)?;
        for license in &carried {
            renewed.adopt_license(license);
        }
        let renewed_id = renewed.uuid;
        let prior_id = renewal.prior_subscription_plan;

        self.plans.insert(renewed_id, renewed);
        if let Some(prior) = self.plans.get_mut(&prior_id) {
            prior.is_active = false;
        }
        if let Some(stored) = self.renewals.get_mut(renewal_id) {
            stored.processed = true;
            stored.renewed_subscription_plan = Some(renewed_id);
        }
        tracing::info!(
            renewal = %renewal_id,
            prior = %prior_id,
            renewed = %renewed_id,
            carried = allocated,
            "renewal processed"
        );
        Ok(renewed_id)
    }

    // ── Expiration ───────────────────────────────────────────────────

    /// Mark an expired plan processed and inactive, and report its
    /// allocated licenses in batches.
    pub fn expire_subscription(
        &mut self,
        plan_id: &SubscriptionPlanId,
        today: NaiveDate,
    ) -> Result<ExpirationReport, RegistryError> {
        let plan = self.subscription_plan_mut(plan_id)?;
        if plan.expiration_processed {
            return Err(RegistryError::ExpirationAlreadyProcessed(*plan_id));
        }
        if !plan.is_expired(today) {
            return Err(RegistryError::NotYetExpired {
                plan: *plan_id,
                expiration_date: plan.expiration_date,
            });
        }
        plan.expiration_processed = true;
        plan.is_active = false;
        let allocated = plan.allocated_license_ids();
        let license_batches: Vec<Vec<LicenseId>> = chunks(&allocated, LICENSE_EXPIRATION_BATCH_SIZE)
            .map(<[LicenseId]>::to_vec)
            .collect();
        tracing::info!(plan = %plan_id, licenses = allocated.len(), batches = license_batches.len(), "subscription expired");
        Ok(ExpirationReport {
            subscription_id: *plan_id,
            license_batches,
        })
    }

    // ── Learners ─────────────────────────────────────────────────────

    /// Every non-revoked license bound to `email`, across all enterprises.
    pub fn licenses_by_user_email(&self, email: &EmailAddress) -> Vec<LearnerLicense<'_>> {
        self.plans
            .values()
            .filter_map(|plan| {
                let license = plan.license_by_email(email)?;
                let agreement = self.agreements.get(&plan.customer_agreement)?;
                Some(LearnerLicense {
                    agreement,
                    plan,
                    license,
                })
            })
            .collect()
    }

    /// The plan whose license answers to `key`.
    ///
    /// A processed renewal carries activation keys into the renewed plan, so
    /// one key can sit in every plan of a renewal chain. Plans already
    /// continued by a processed renewal are skipped, leaving the end of the
    /// chain.
    pub fn plan_for_activation_key(
        &self,
        key: &ActivationKey,
    ) -> Result<&SubscriptionPlan, RegistryError> {
        self.plans
            .values()
            .filter(|p| p.license_by_activation_key(key).is_some())
            .filter(|p| !self.renewal_for_plan(&p.uuid).is_some_and(|r| r.processed))
            .max_by_key(|p| p.start_date)
            .ok_or(RegistryError::UnknownActivationKey(*key))
    }

    /// Activate the license carrying `key` in the plan
    /// [`plan_for_activation_key`](Self::plan_for_activation_key) picks.
    pub fn activate_license(
        &mut self,
        key: &ActivationKey,
        lms_user_id: u64,
        now: Timestamp,
    ) -> Result<(SubscriptionPlanId, LicenseId), RegistryError> {
        let plan_id = self.plan_for_activation_key(key)?.uuid;
        let license = self
            .subscription_plan_mut(&plan_id)?
            .activate_license(key, lms_user_id, now)?;
        Ok((plan_id, license))
    }

    // ── Retirement ───────────────────────────────────────────────────

    /// Remove a user from every license and from license history.
    ///
    /// Non-revoked licenses go back to the unassigned pool; revoked ones
    /// keep their status and only lose PII. Returns the number of licenses
    /// touched.
    pub fn retire_user(
        &mut self,
        email: Option<&EmailAddress>,
        lms_user_id: Option<u64>,
        now: Timestamp,
    ) -> usize {
        let mut touched = 0;
        for plan in self.plans.values_mut() {
            for license in plan.licenses_mut() {
                if !license.belongs_to(email, lms_user_id) {
                    continue;
                }
                if license.status == LicenseStatus::Revoked {
                    license.clear_pii();
                } else {
                    license.reset_to_unassigned(now);
                }
                license.clear_historical_pii();
                touched += 1;
            }
        }
        tracing::info!(licenses = touched, "user retired");
        touched
    }

    /// Clear PII from licenses revoked at least `DAYS_TO_RETIRE` days ago.
    pub fn retire_stale_revoked_licenses(&mut self, now: Timestamp) -> usize {
        let mut retired = 0;
        for plan in self.plans.values_mut() {
            for license in plan.licenses_mut() {
                let stale = license.status == LicenseStatus::Revoked
                    && license
                        .revoked_date
                        .is_some_and(|revoked| revoked.days_between(&now) >= DAYS_TO_RETIRE);
                let has_pii = license.user_email.is_some() || license.lms_user_id.is_some();
                if stale && has_pii {
                    license.clear_pii();
                    license.clear_historical_pii();
                    retired += 1;
                }
            }
        }
        tracing::info!(licenses = retired, "stale revoked licenses retired");
        retired
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use lm_core::{EnterpriseCatalogId, SalesforceOpportunityId};

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn now() -> Timestamp {
        ts("2026-03-01T09:00:00Z")
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn email(s: &str) -> EmailAddress {
        EmailAddress::new(s).unwrap()
    }

    fn sf() -> SalesforceOpportunityId {
        SalesforceOpportunityId::new("0060M00000abcdeXYZ").unwrap()
    }

    fn agreement(slug: &str) -> CustomerAgreement {
        CustomerAgreement::new(
            EnterpriseCustomerId::new(),
            EnterpriseSlug::new(slug).unwrap(),
            slug,
            Some(EnterpriseCatalogId::new()),
            now(),
        )
    }

    fn terms(title: &str, start: &str, end: &str, n: u64) -> PlanTerms {
        PlanTerms {
            title: PlanTitle::new(title).unwrap(),
            start_date: date(start),
            expiration_date: date(end),
            enterprise_catalog_uuid: None,
            revoke_max_percentage: 5,
            salesforce_opportunity_id: sf(),
            netsuite_product_id: 1,
            for_internal_use_only: false,
            is_active: true,
            num_licenses: n,
        }
    }

    fn renewal_terms(effective: &str, end: &str, n: u64) -> RenewalTerms {
        RenewalTerms {
            salesforce_opportunity_id: sf(),
            number_of_licenses: n,
            effective_date: date(effective),
            renewed_expiration_date: date(end),
        }
    }

    /// Registry with one agreement and one 5-license plan for 2026.
    fn setup() -> (SubscriptionRegistry, CustomerAgreementId, SubscriptionPlanId) {
        let mut registry = SubscriptionRegistry::new();
        let agreement_id = registry.add_customer_agreement(agreement("acme")).unwrap();
        let plan_id = registry
            .add_subscription_plan(&agreement_id, terms("Annual", "2026-01-01", "2026-12-31", 5), now())
            .unwrap();
        (registry, agreement_id, plan_id)
    }

    fn activate(registry: &mut SubscriptionRegistry, plan: &SubscriptionPlanId, addr: &str, lms: u64) {
        let p = registry.subscription_plan_mut(plan).unwrap();
        p.assign_licenses(&[email(addr)], now()).unwrap();
        let key = p.license_by_email(&email(addr)).unwrap().activation_key.unwrap();
        registry.activate_license(&key, lms, now()).unwrap();
    }

    // ── Agreements & plans ───────────────────────────────────────────

    #[test]
    fn duplicate_enterprise_and_slug_rejected() {
        let mut registry = SubscriptionRegistry::new();
        let first = agreement("acme");
        let enterprise = first.enterprise_customer_uuid;
        registry.add_customer_agreement(first).unwrap();

        let mut same_enterprise = agreement("other");
        same_enterprise.enterprise_customer_uuid = enterprise;
        assert_eq!(
            registry.add_customer_agreement(same_enterprise).unwrap_err(),
            RegistryError::DuplicateEnterprise(enterprise)
        );
        assert!(matches!(
            registry.add_customer_agreement(agreement("acme")),
            Err(RegistryError::DuplicateSlug(_))
        ));
    }

    #[test]
    fn plan_titles_unique_per_agreement() {
        let (mut registry, agreement_id, _) = setup();
        let err = registry
            .add_subscription_plan(&agreement_id, terms("Annual", "2027-01-01", "2027-12-31", 1), now())
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicatePlanTitle { .. }));

        // Same title under a different agreement is fine.
        let other = registry.add_customer_agreement(agreement("globex")).unwrap();
        registry
            .add_subscription_plan(&other, terms("Annual", "2026-01-01", "2026-12-31", 1), now())
            .unwrap();
    }

    #[test]
    fn plan_under_unknown_agreement_fails() {
        let mut registry = SubscriptionRegistry::new();
        let missing = CustomerAgreementId::new();
        assert_eq!(
            registry
                .add_subscription_plan(&missing, terms("A", "2026-01-01", "2026-12-31", 1), now())
                .unwrap_err(),
            RegistryError::AgreementNotFound(missing)
        );
    }

    // ── Renewals ─────────────────────────────────────────────────────

    #[test]
    fn one_renewal_per_prior_plan() {
        let (mut registry, _, plan_id) = setup();
        registry
            .add_renewal(&plan_id, renewal_terms("2027-01-01", "2027-12-31", 5), now())
            .unwrap();
        assert_eq!(
            registry
                .add_renewal(&plan_id, renewal_terms("2027-01-01", "2027-12-31", 5), now())
                .unwrap_err(),
            RegistryError::DuplicateRenewal(plan_id)
        );
    }

    #[test]
    fn future_renewals_follow_the_chain() {
        let (mut registry, _, plan_id) = setup();
        assert!(registry.future_renewals(&plan_id).is_empty());

        let first = registry
            .add_renewal(&plan_id, renewal_terms("2027-01-01", "2027-12-31", 5), now())
            .unwrap();
        let renewed = registry.process_renewal(&first, now()).unwrap();
        let second = registry
            .add_renewal(&renewed, renewal_terms("2028-01-01", "2028-12-31", 5), now())
            .unwrap();

        let chain: Vec<RenewalId> = registry
            .future_renewals(&plan_id)
            .iter()
            .map(|r| r.uuid)
            .collect();
        assert_eq!(chain, vec![first, second]);

        let today = date("2026-12-01");
        assert_eq!(
            registry
                .days_until_expiration_including_renewals(&plan_id, today)
                .unwrap(),
            days_until(date("2028-12-31"), today)
        );
        assert_eq!(
            registry
                .days_until_expiration_including_renewals(&renewed, today)
                .unwrap(),
            days_until(date("2028-12-31"), today)
        );
    }

    #[test]
    fn process_renewal_carries_allocated_licenses() {
        let (mut registry, _, plan_id) = setup();
        activate(&mut registry, &plan_id, "a@example.com", 1);
        registry
            .subscription_plan_mut(&plan_id)
            .unwrap()
            .assign_licenses(&[email("b@example.com")], now())
            .unwrap();

        let renewal = registry
            .add_renewal(&plan_id, renewal_terms("2027-01-01", "2027-12-31", 10), now())
            .unwrap();
        let renewed_id = registry.process_renewal(&renewal, now()).unwrap();

        let renewed = registry.subscription_plan(&renewed_id).unwrap();
        assert_eq!(renewed.title.as_str(), "Annual - Renewal");
        assert_eq!(renewed.start_date, date("2027-01-01"));
        assert_eq!(renewed.num_licenses(), 10);
        let overview = renewed.status_overview();
        assert_eq!((overview.activated, overview.assigned, overview.unassigned), (1, 1, 8));
        assert!(renewed.is_active);

        let prior = registry.subscription_plan(&plan_id).unwrap();
        assert!(!prior.is_active);
        let stored = registry.renewal(&renewal).unwrap();
        assert!(stored.processed);
        assert_eq!(stored.renewed_subscription_plan, Some(renewed_id));

        assert_eq!(
            registry.process_renewal(&renewal, now()).unwrap_err(),
            RegistryError::RenewalAlreadyProcessed(renewal)
        );
    }

    #[test]
    fn renewal_too_small_for_allocated_licenses() {
        let (mut registry, _, plan_id) = setup();
        activate(&mut registry, &plan_id, "a@example.com", 1);
        activate(&mut registry, &plan_id, "b@example.com", 2);
        let renewal = registry
            .add_renewal(&plan_id, renewal_terms("2027-01-01", "2027-12-31", 1), now())
            .unwrap();
        assert_eq!(
            registry.process_renewal(&renewal, now()).unwrap_err(),
            RegistryError::RenewalCapacity {
                allocated: 2,
                capacity: 1
            }
        );
    }

    #[test]
    fn carried_activation_key_resolves_to_renewed_plan() {
        let (mut registry, _, plan_id) = setup();
        registry
            .subscription_plan_mut(&plan_id)
            .unwrap()
            .assign_licenses(&[email("a@example.com")], now())
            .unwrap();
        let key = registry
            .subscription_plan(&plan_id)
            .unwrap()
            .license_by_email(&email("a@example.com"))
            .unwrap()
            .activation_key
            .unwrap();
        let renewal = registry
            .add_renewal(&plan_id, renewal_terms("2027-01-01", "2027-12-31", 5), now())
            .unwrap();
        let renewed = registry.process_renewal(&renewal, now()).unwrap();

        let (activated_in, _) = registry.activate_license(&key, 9, now()).unwrap();
        assert_eq!(activated_in, renewed);
    }

    #[test]
    fn same_day_renewal_activates_in_renewed_plan() {
        for _ in 0..32 {
            let (mut registry, _, plan_id) = setup();
            registry
                .subscription_plan_mut(&plan_id)
                .unwrap()
                .assign_licenses(&[email("a@example.com")], now())
                .unwrap();
            let key = registry
                .subscription_plan(&plan_id)
                .unwrap()
                .license_by_email(&email("a@example.com"))
                .unwrap()
                .activation_key
                .unwrap();
            let renewal = registry
                .add_renewal(&plan_id, renewal_terms("2026-01-01", "2027-12-31", 5), now())
                .unwrap();
            let renewed = registry.process_renewal(&renewal, now()).unwrap();
            assert_eq!(registry.plan_for_activation_key(&key).unwrap().uuid, renewed);

            let (activated_in, license_id) = registry.activate_license(&key, 7, now()).unwrap();
            assert_eq!(activated_in, renewed);
            let license = registry
                .subscription_plan(&renewed)
                .unwrap()
                .license(&license_id)
                .unwrap();
            assert_eq!(license.status, LicenseStatus::Activated);
            assert_eq!(license.subscription_plan_title.as_str(), "Annual - Renewal");
            let prior = registry.subscription_plan(&plan_id).unwrap();
            assert!(!prior.is_active);
            assert_ne!(
                prior.license_by_activation_key(&key).unwrap().status,
                LicenseStatus::Activated
            );
        }
    }

    #[test]
    fn ordered_expirations_put_active_first() {
        let (mut registry, agreement_id, plan_id) = setup();
        let old = registry
            .add_subscription_plan(&agreement_id, terms("Pilot", "2025-01-01", "2025-06-30", 1), now())
            .unwrap();
        registry.subscription_plan_mut(&old).unwrap().is_active = false;
        let today = date("2026-03-01");
        let ordered = registry
            .ordered_subscription_plan_expirations(&agreement_id, today)
            .unwrap();
        assert_eq!(ordered.len(), 2);
        assert_eq!(ordered[0].subscription_id, plan_id);
        assert!(ordered[0].is_active);
        assert_eq!(ordered[1].subscription_id, old);
        assert!(ordered[1].days_until_expiration < 0);
    }

    // ── Expiration ───────────────────────────────────────────────────

    #[test]
    fn expire_subscription_reports_batches() {
        let (mut registry, _, plan_id) = setup();
        activate(&mut registry, &plan_id, "a@example.com", 1);

        assert!(matches!(
            registry.expire_subscription(&plan_id, date("2026-06-01")),
            Err(RegistryError::NotYetExpired { .. })
        ));
        assert_eq!(registry.plans_pending_expiration(date("2027-01-01")).len(), 1);

        let report = registry
            .expire_subscription(&plan_id, date("2027-01-01"))
            .unwrap();
        assert_eq!(report.num_licenses(), 1);
        assert_eq!(report.license_batches.len(), 1);
        let plan = registry.subscription_plan(&plan_id).unwrap();
        assert!(plan.expiration_processed);
        assert!(!plan.is_active);
        assert!(registry.plans_pending_expiration(date("2027-01-01")).is_empty());

        assert_eq!(
            registry
                .expire_subscription(&plan_id, date("2027-01-01"))
                .unwrap_err(),
            RegistryError::ExpirationAlreadyProcessed(plan_id)
        );
    }

    #[test]
    fn expiration_batches_respect_batch_size() {
        let mut registry = SubscriptionRegistry::new();
        let agreement_id = registry.add_customer_agreement(agreement("big")).unwrap();
        let plan_id = registry
            .add_subscription_plan(&agreement_id, terms("Big", "2026-01-01", "2026-01-31", 450), now())
            .unwrap();
        let emails: Vec<EmailAddress> = (0..450)
            .map(|i| email(&format!("learner{i}@example.com")))
            .collect();
        registry
            .subscription_plan_mut(&plan_id)
            .unwrap()
            .assign_licenses(&emails, now())
            .unwrap();
        let report = registry
            .expire_subscription(&plan_id, date("2026-02-01"))
            .unwrap();
        let sizes: Vec<usize> = report.license_batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![200, 200, 50]);
    }

    // ── Learners ─────────────────────────────────────────────────────

    #[test]
    fn licenses_by_user_email_spans_enterprises() {
        let (mut registry, _, plan_id) = setup();
        let other_agreement = registry.add_customer_agreement(agreement("globex")).unwrap();
        let other_plan = registry
            .add_subscription_plan(&other_agreement, terms("Team", "2026-01-01", "2026-12-31", 2), now())
            .unwrap();
        for plan in [&plan_id, &other_plan] {
            registry
                .subscription_plan_mut(plan)
                .unwrap()
                .assign_licenses(&[email("a@example.com")], now())
                .unwrap();
        }
        let found = registry.licenses_by_user_email(&email("a@example.com"));
        assert_eq!(found.len(), 2);
        assert!(found
            .iter()
            .any(|l| l.agreement.enterprise_customer_slug.as_str() == "globex"));
    }

    #[test]
    fn activation_with_unknown_key_fails() {
        let (mut registry, _, _) = setup();
        let key = ActivationKey::new();
        assert_eq!(
            registry.activate_license(&key, 1, now()).unwrap_err(),
            RegistryError::UnknownActivationKey(key)
        );
    }

    // ── Retirement ───────────────────────────────────────────────────

    #[test]
    fn retire_user_resets_and_scrubs() {
        let (mut registry, _, plan_id) = setup();
        activate(&mut registry, &plan_id, "a@example.com", 1);
        activate(&mut registry, &plan_id, "b@example.com", 2);
        registry
            .subscription_plan_mut(&plan_id)
            .unwrap()
            .revoke_license(&email("b@example.com"), now())
            .unwrap();
        // b is revoked; reassign and activate again so b holds one of each.
        activate(&mut registry, &plan_id, "b@example.com", 2);

        let touched = registry.retire_user(Some(&email("b@example.com")), Some(2), now());
        assert_eq!(touched, 2);

        let plan = registry.subscription_plan(&plan_id).unwrap();
        assert!(plan.license_by_email(&email("b@example.com")).is_none());
        let revoked: Vec<&License> = plan.licenses_by_status(LicenseStatus::Revoked).collect();
        assert_eq!(revoked.len(), 1);
        assert!(revoked[0].user_email.is_none());
        for license in plan.licenses() {
            assert!(license
                .transitions
                .iter()
                .all(|t| t.user_email.as_ref() != Some(&email("b@example.com")) && t.lms_user_id != Some(2)));
        }
        // a is untouched.
        assert!(plan.license_by_email(&email("a@example.com")).is_some());
    }

    #[test]
    fn retire_by_lms_id_only() {
        let (mut registry, _, plan_id) = setup();
        activate(&mut registry, &plan_id, "a@example.com", 77);
        assert_eq!(registry.retire_user(None, Some(77), now()), 1);
        assert_eq!(
            registry.subscription_plan(&plan_id).unwrap().status_overview().unassigned,
            5
        );
    }

    #[test]
    fn stale_revoked_licenses_lose_pii() {
        let (mut registry, _, plan_id) = setup();
        activate(&mut registry, &plan_id, "a@example.com", 1);
        registry
            .subscription_plan_mut(&plan_id)
            .unwrap()
            .revoke_license(&email("a@example.com"), now())
            .unwrap();

        assert_eq!(registry.retire_stale_revoked_licenses(ts("2026-04-01T09:00:00Z")), 0);
        // 2026-03-01 + 90 days = 2026-05-30.
        assert_eq!(registry.retire_stale_revoked_licenses(ts("2026-05-30T09:00:00Z")), 1);
        assert_eq!(registry.retire_stale_revoked_licenses(ts("2026-06-30T09:00:00Z")), 0);
    }
}
