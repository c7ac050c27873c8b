//! # Subscription Plan
//!
//! A subscription plan is a pool of licenses bought by an enterprise for a
//! fixed period. The plan owns its licenses and enforces the invariants that
//! span more than one of them:
//!
//! - within a plan, a learner email or LMS user id is bound to at most one
//!   non-revoked license;
//! - the non-revoked license count stays within
//!   `[MIN_NUM_LICENSES, MAX_NUM_LICENSES]`;
//! - revocations of activated licenses are capped at
//!   `ceil(num_licenses * revoke_max_percentage / 100)`.
//!
//! Revoked licenses are excluded from `num_licenses` because every revocation
//! mints a replacement unassigned license.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lm_core::constants::{DEFAULT_REVOKE_MAX_PERCENTAGE, MAX_NUM_LICENSES};
use lm_core::{
    days_until, revocations_allowed, ActivationKey, CustomerAgreementId, EmailAddress,
    EnterpriseCatalogId, EnterpriseCustomerId, LicenseId, PlanTitle, SalesforceOpportunityId,
    SubscriptionPlanId, Timestamp,
};

use crate::agreement::CustomerAgreement;
use crate::license::{License, LicenseError, LicenseStatus};

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors raised by plan-level operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// Start date falls after the expiration date.
    #[error("start date {start} is after expiration date {expiration}")]
    InvalidDates {
        start: NaiveDate,
        expiration: NaiveDate,
    },

    /// Revocation percentage must lie in 0..=100.
    #[error("revoke_max_percentage must be between 0 and 100, got {0}")]
    InvalidRevokePercentage(u8),

    /// The resulting license count would exceed the maximum.
    #[error("a plan may hold at most {max} licenses, {requested} requested")]
    TooManyLicenses { requested: u64, max: u64 },

    /// Neither the plan nor its agreement names an enterprise catalog.
    #[error("plan has no enterprise catalog and its agreement has no default")]
    MissingCatalog,

    /// Not enough unassigned licenses to satisfy an assignment.
    #[error("{requested} licenses requested but only {available} unassigned")]
    NotEnoughUnassignedLicenses { requested: usize, available: usize },

    /// The same email appears more than once in one request.
    #[error("email {0} appears more than once in the request")]
    DuplicateEmail(EmailAddress),

    /// The email already holds a non-revoked license in this plan.
    #[error("email {0} already holds a license in this plan")]
    AlreadyAllocated(EmailAddress),

    /// No non-revoked license is bound to the email.
    #[error("no license is assigned to {0}")]
    NoLicenseForEmail(EmailAddress),

    /// No license carries the activation key.
    #[error("no license matches activation key {0}")]
    NoLicenseForKey(ActivationKey),

    /// The LMS user already holds another license in this plan.
    #[error("LMS user {0} already holds a license in this plan")]
    DuplicateLearner(u64),

    /// Revoking another activated license would exceed the cap.
    #[error("plan {plan} has used {applied} of {allowed} allowed revocations")]
    RevocationCapReached {
        plan: SubscriptionPlanId,
        applied: u64,
        allowed: u64,
    },

    /// A single license rejected the transition.
    #[error(transparent)]
    License(#[from] LicenseError),
}

// ─── Plan terms ──────────────────────────────────────────────────────

fn default_revoke_max_percentage() -> u8 {
    DEFAULT_REVOKE_MAX_PERCENTAGE
}

/// Commercial terms used to create a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTerms {
    pub title: PlanTitle,
    pub start_date: NaiveDate,
    pub expiration_date: NaiveDate,
    /// Falls back to the agreement's default catalog when absent.
    #[serde(default)]
    pub enterprise_catalog_uuid: Option<EnterpriseCatalogId>,
    #[serde(default = "default_revoke_max_percentage")]
    pub revoke_max_percentage: u8,
    pub salesforce_opportunity_id: SalesforceOpportunityId,
    pub netsuite_product_id: u64,
    #[serde(default)]
    pub for_internal_use_only: bool,
    #[serde(default)]
    pub is_active: bool,
    /// Number of unassigned licenses to create with the plan.
    #[serde(default)]
    pub num_licenses: u64,
}

// ─── Derived views ───────────────────────────────────────────────────

/// Result of a successful revocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RevocationOutcome {
    /// The license that was revoked.
    pub revoked_license: LicenseId,
    /// Status the license held before revocation.
    pub previous_status: LicenseStatus,
    /// The unassigned license created in its place.
    pub replacement_license: LicenseId,
    /// Whether this revocation was counted against the cap.
    pub counted_against_cap: bool,
    /// Whether this revocation used the last remaining revocation.
    pub cap_exhausted: bool,
}

/// License counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusOverview {
    pub activated: u64,
    pub assigned: u64,
    pub unassigned: u64,
    pub revoked: u64,
}

impl StatusOverview {
    /// Non-revoked licenses.
    pub fn total(&self) -> u64 {
        self.activated + self.assigned + self.unassigned
    }

    /// Assigned plus activated.
    pub fn allocated(&self) -> u64 {
        self.activated + self.assigned
    }
}

// ─── Plan ────────────────────────────────────────────────────────────

/// A pool of licenses sold to an enterprise for a fixed period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub uuid: SubscriptionPlanId,
    pub title: PlanTitle,
    pub start_date: NaiveDate,
    pub expiration_date: NaiveDate,
    pub expiration_processed: bool,
    pub enterprise_catalog_uuid: EnterpriseCatalogId,
    pub customer_agreement: CustomerAgreementId,
    /// Copied from the agreement at creation.
    pub enterprise_customer_uuid: EnterpriseCustomerId,
    pub is_active: bool,
    pub revoke_max_percentage: u8,
    pub num_revocations_applied: u64,
    pub salesforce_opportunity_id: SalesforceOpportunityId,
    pub netsuite_product_id: u64,
    pub for_internal_use_only: bool,
    pub created_at: Timestamp,
    pub(crate) licenses: BTreeMap<LicenseId, License>,
}

impl SubscriptionPlan {
    /// Create a plan under `agreement` with `terms.num_licenses` unassigned
    /// licenses.
    pub fn new(
        terms: PlanTerms,
        agreement: &CustomerAgreement,
        now: Timestamp,
    ) -> Result<Self, PlanError> {
        if terms.start_date > terms.expiration_date {
            return Err(PlanError::InvalidDates {
                start: terms.start_date,
                expiration: terms.expiration_date,
            });
        }
        if terms.revoke_max_percentage > 100 {
            return Err(PlanError::InvalidRevokePercentage(terms.revoke_max_percentage));
        }
        let catalog = terms
            .enterprise_catalog_uuid
            .or(agreement.default_enterprise_catalog_uuid)
            .ok_or(PlanError::MissingCatalog)?;

        let mut plan = Self {
            uuid: SubscriptionPlanId::new(),
            title: terms.title,
            start_date: terms.start_date,
            expiration_date: terms.expiration_date,
            expiration_processed: false,
            enterprise_catalog_uuid: catalog,
            customer_agreement: agreement.uuid,
            enterprise_customer_uuid: agreement.enterprise_customer_uuid,
            is_active: terms.is_active,
            revoke_max_percentage: terms.revoke_max_percentage,
            num_revocations_applied: 0,
            salesforce_opportunity_id: terms.salesforce_opportunity_id,
            netsuite_product_id: terms.netsuite_product_id,
            for_internal_use_only: terms.for_internal_use_only,
            created_at: now,
            licenses: BTreeMap::new(),
        };
        plan.increase_num_licenses(terms.num_licenses, now)?;
        Ok(plan)
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Every license, in ascending id order.
    pub fn licenses(&self) -> impl Iterator<Item = &License> {
        self.licenses.values()
    }

    /// Look up one license.
    pub fn license(&self, id: &LicenseId) -> Option<&License> {
        self.licenses.get(id)
    }

    /// Licenses that are not revoked.
    pub fn num_licenses(&self) -> u64 {
        self.licenses
            .values()
            .filter(|l| l.status != LicenseStatus::Revoked)
            .count() as u64
    }

    /// Assigned plus activated licenses.
    pub fn num_allocated_licenses(&self) -> u64 {
        self.licenses.values().filter(|l| l.is_allocated()).count() as u64
    }

    /// Licenses not yet bound to a learner.
    pub fn unassigned_licenses(&self) -> impl Iterator<Item = &License> {
        self.licenses_by_status(LicenseStatus::Unassigned)
    }

    /// Licenses in the given status, in ascending id order.
    pub fn licenses_by_status(&self, status: LicenseStatus) -> impl Iterator<Item = &License> {
        self.licenses.values().filter(move |l| l.status == status)
    }

    /// The non-revoked license bound to `email`, if any.
    pub fn license_by_email(&self, email: &EmailAddress) -> Option<&License> {
        self.licenses
            .values()
            .find(|l| l.status != LicenseStatus::Revoked && l.user_email.as_ref() == Some(email))
    }

    /// The license carrying `key`, if any.
    pub fn license_by_activation_key(&self, key: &ActivationKey) -> Option<&License> {
        self.licenses
            .values()
            .find(|l| l.activation_key.as_ref() == Some(key))
    }

    /// How many activated licenses may be revoked over the plan's life.
    pub fn num_revocations_allowed(&self) -> u64 {
        revocations_allowed(self.num_licenses(), self.revoke_max_percentage)
    }

    /// Revocations still available. Never negative.
    pub fn num_revocations_remaining(&self) -> u64 {
        self.num_revocations_allowed()
            .saturating_sub(self.num_revocations_applied)
    }

    pub fn has_revocations_remaining(&self) -> bool {
        self.num_revocations_remaining() > 0
    }

    /// Days from `today` until the plan expires. Negative once past.
    pub fn days_until_expiration(&self, today: NaiveDate) -> i64 {
        days_until(self.expiration_date, today)
    }

    /// Whether `today` falls within the plan's term.
    pub fn is_current(&self, today: NaiveDate) -> bool {
        self.start_date <= today && today <= self.expiration_date
    }

    /// Whether the plan has reached its expiration date.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.days_until_expiration(today) <= 0
    }

    pub fn status_overview(&self) -> StatusOverview {
        let mut overview = StatusOverview::default();
        for license in self.licenses.values() {
            match license.status {
                LicenseStatus::Activated => overview.activated += 1,
                LicenseStatus::Assigned => overview.assigned += 1,
                LicenseStatus::Unassigned => overview.unassigned += 1,
                LicenseStatus::Revoked => overview.revoked += 1,
            }
        }
        overview
    }

    /// Ids of assigned and activated licenses, in ascending order.
    pub fn allocated_license_ids(&self) -> Vec<LicenseId> {
        self.licenses
            .values()
            .filter(|l| l.is_allocated())
            .map(|l| l.uuid)
            .collect()
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Add `n` unassigned licenses. Returns their ids.
    pub fn increase_num_licenses(
        &mut self,
        n: u64,
        now: Timestamp,
    ) -> Result<Vec<LicenseId>, PlanError> {
        let requested = self.num_licenses().saturating_add(n);
        if requested > MAX_NUM_LICENSES {
            return Err(PlanError::TooManyLicenses {
                requested,
                max: MAX_NUM_LICENSES,
            });
        }
        let mut created = Vec::with_capacity(n as usize);
        for _ in 0..n {
            let license = License::new_unassigned(self.uuid, self.title.clone(), now);
            created.push(license.uuid);
            self.licenses.insert(license.uuid, license);
        }
        Ok(created)
    }

    /// Assign one unassigned license to each email.
    ///
    /// The whole request is validated before any license changes, so a
    /// failure leaves the plan untouched.
    pub fn assign_licenses(
        &mut self,
        emails: &[EmailAddress],
        now: Timestamp,
    ) -> Result<Vec<LicenseId>, PlanError> {
        let mut seen = BTreeSet::new();
        for email in emails {
            if !seen.insert(email) {
                return Err(PlanError::DuplicateEmail(email.clone()));
            }
            if self.license_by_email(email).is_some() {
                return Err(PlanError::AlreadyAllocated(email.clone()));
            }
        }

        let targets: Vec<LicenseId> = self
            .unassigned_licenses()
            .take(emails.len())
            .map(|l| l.uuid)
            .collect();
        if targets.len() < emails.len() {
            return Err(PlanError::NotEnoughUnassignedLicenses {
                requested: emails.len(),
                available: targets.len(),
            });
        }

        for (id, email) in targets.iter().zip(emails) {
            if let Some(license) = self.licenses.get_mut(id) {
                license.assign(email.clone(), now)?;
            }
        }
        tracing::debug!(plan = %self.uuid, count = targets.len(), "assigned licenses");
        Ok(targets)
    }

    /// Activate the license carrying `key` for `lms_user_id`.
    pub fn activate_license(
        &mut self,
        key: &ActivationKey,
        lms_user_id: u64,
        now: Timestamp,
    ) -> Result<LicenseId, PlanError> {
        let id = self
            .license_by_activation_key(key)
            .map(|l| l.uuid)
            .ok_or(PlanError::NoLicenseForKey(*key))?;
        let held_elsewhere = self.licenses.values().any(|l| {
            l.uuid != id && l.status != LicenseStatus::Revoked && l.lms_user_id == Some(lms_user_id)
        });
        if held_elsewhere {
            return Err(PlanError::DuplicateLearner(lms_user_id));
        }
        if let Some(license) = self.licenses.get_mut(&id) {
            license.activate(lms_user_id, now)?;
        }
        Ok(id)
    }

    /// Revoke the license bound to `email` and mint a replacement.
    pub fn revoke_license(
        &mut self,
        email: &EmailAddress,
        now: Timestamp,
    ) -> Result<RevocationOutcome, PlanError> {
        let (id, previous_status) = self
            .license_by_email(email)
            .map(|l| (l.uuid, l.status))
            .ok_or_else(|| PlanError::NoLicenseForEmail(email.clone()))?;

        let counted = previous_status == LicenseStatus::Activated;
        if counted && !self.has_revocations_remaining() {
            return Err(PlanError::RevocationCapReached {
                plan: self.uuid,
                applied: self.num_revocations_applied,
                allowed: self.num_revocations_allowed(),
            });
        }

        if let Some(license) = self.licenses.get_mut(&id) {
            license.revoke(now)?;
        }
        if counted {
            self.num_revocations_applied += 1;
        }
        let replacement = License::new_unassigned(self.uuid, self.title.clone(), now);
        let replacement_id = replacement.uuid;
        self.licenses.insert(replacement_id, replacement);

        let cap_exhausted = counted && !self.has_revocations_remaining();
        tracing::info!(
            plan = %self.uuid,
            license = %id,
            counted,
            cap_exhausted,
            "revoked license"
        );
        Ok(RevocationOutcome {
            revoked_license: id,
            previous_status,
            replacement_license: replacement_id,
            counted_against_cap: counted,
            cap_exhausted,
        })
    }

    /// Record a reminder for the assigned license bound to `email`.
    pub fn remind(&mut self, email: &EmailAddress, now: Timestamp) -> Result<LicenseId, PlanError> {
        let id = self
            .license_by_email(email)
            .map(|l| l.uuid)
            .ok_or_else(|| PlanError::NoLicenseForEmail(email.clone()))?;
        if let Some(license) = self.licenses.get_mut(&id) {
            license.remind(now)?;
        }
        Ok(id)
    }

    /// Record a reminder on every assigned license. Returns their ids.
    pub fn remind_all(&mut self, now: Timestamp) -> Vec<LicenseId> {
        let mut reminded = Vec::new();
        for license in self.licenses.values_mut() {
            if license.status == LicenseStatus::Assigned && license.remind(now).is_ok() {
                reminded.push(license.uuid);
            }
        }
        reminded
    }

    /// Insert a license carried over from another plan, re-homed onto this
    /// plan under a fresh id.
    pub(crate) fn adopt_license(&mut self, source: &License) -> LicenseId {
        let mut license = source.clone();
        license.uuid = LicenseId::new();
        license.subscription_plan = self.uuid;
        license.subscription_plan_title = self.title.clone();
        let id = license.uuid;
        self.licenses.insert(id, license);
        id
    }

    pub(crate) fn licenses_mut(&mut self) -> impl Iterator<Item = &mut License> {
        self.licenses.values_mut()
    }
}

impl std::fmt::Display for SubscriptionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<SubscriptionPlan with Title '{}' for EnterpriseCustomer '{}'{}>",
            self.title,
            self.enterprise_customer_uuid,
            if self.for_internal_use_only {
                " (for internal use only)"
            } else {
                ""
            }
        )
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
