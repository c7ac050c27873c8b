//! # Customer Agreement
//!
//! The contract between an enterprise and the license manager. One agreement
//! per enterprise; it groups that enterprise's subscription plans.

use serde::{Deserialize, Serialize};

use lm_core::{
    CustomerAgreementId, EnterpriseCatalogId, EnterpriseCustomerId, EnterpriseSlug,
    SubscriptionPlanId, Timestamp,
};

/// An enterprise's agreement, owning zero or more subscription plans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerAgreement {
    pub uuid: CustomerAgreementId,
    pub enterprise_customer_uuid: EnterpriseCustomerId,
    pub enterprise_customer_slug: EnterpriseSlug,
    pub enterprise_customer_name: String,
    /// Catalog used for plans that do not name their own.
    pub default_enterprise_catalog_uuid: Option<EnterpriseCatalogId>,
    pub created_at: Timestamp,
}

impl CustomerAgreement {
    pub fn new(
        enterprise_customer_uuid: EnterpriseCustomerId,
        enterprise_customer_slug: EnterpriseSlug,
        enterprise_customer_name: impl Into<String>,
        default_enterprise_catalog_uuid: Option<EnterpriseCatalogId>,
        now: Timestamp,
    ) -> Self {
        Self {
            uuid: CustomerAgreementId::new(),
            enterprise_customer_uuid,
            enterprise_customer_slug,
            enterprise_customer_name: enterprise_customer_name.into(),
            default_enterprise_catalog_uuid,
            created_at: now,
        }
    }
}

impl std::fmt::Display for CustomerAgreement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<CustomerAgreement: '{}'>",
            self.enterprise_customer_slug
        )
    }
}

/// Expiration summary for one plan of an agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanExpiration {
    pub subscription_id: SubscriptionPlanId,
    pub days_until_expiration: i64,
    pub days_until_expiration_including_renewals: i64,
    pub is_active: bool,
}

/// Sort expirations by `(is_active, days_including_renewals)`, descending:
/// active plans first, the furthest-out expiration leading each group.
pub fn order_expirations(mut expirations: Vec<PlanExpiration>) -> Vec<PlanExpiration> {
    expirations.sort_by(|a, b| {
        (b.is_active, b.days_until_expiration_including_renewals)
            .cmp(&(a.is_active, a.days_until_expiration_including_renewals))
    });
    expirations
}
