//! # Seed Files
//!
//! YAML bootstrap data for the registry: agreements with their plans,
//! renewals that reference plans by `(enterprise slug, plan title)`, and the
//! content of each enterprise catalog.
//!
//! ```yaml
//! agreements:
//!   - enterprise_customer_uuid: 4f1c0b7e-5a1d-4a53-9d55-2d6a8c3b9e10
//!     enterprise_customer_slug: acme
//!     enterprise_customer_name: Acme Corp
//!     default_enterprise_catalog_uuid: 0d5e0a5c-8f4b-4c62-a8b4-5f0f7b7d2c11
//!     plans:
//!       - title: Annual
//!         start_date: 2026-01-01
//!         expiration_date: 2026-12-31
//!         salesforce_opportunity_id: 0060M00000abcdeXYZ
//!         netsuite_product_id: 101
//!         num_licenses: 50
//!         is_active: true
//! renewals:
//!   - enterprise_customer_slug: acme
//!     prior_plan_title: Annual
//!     salesforce_opportunity_id: 0060M00000zyxwvABC
//!     number_of_licenses: 60
//!     effective_date: 2027-01-01
//!     renewed_expiration_date: 2027-12-31
//! catalogs:
//!   0d5e0a5c-8f4b-4c62-a8b4-5f0f7b7d2c11:
//!     - course-v1:edX+DemoX+Demo_Course
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lm_core::{
    EnterpriseCatalogId, EnterpriseCustomerId, EnterpriseSlug, PlanTitle, SalesforceOpportunityId,
    Timestamp,
};

use crate::agreement::CustomerAgreement;
use crate::catalog::StaticContentCatalog;
use crate::plan::PlanTerms;
use crate::registry::{RegistryError, SubscriptionRegistry};
use crate::renewal::RenewalTerms;

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("failed to read seed file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid seed file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("renewal references unknown enterprise {0}")]
    UnknownEnterprise(EnterpriseSlug),

    #[error("renewal references unknown plan {title:?} of enterprise {slug}")]
    UnknownPlan { slug: EnterpriseSlug, title: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub agreements: Vec<SeedAgreement>,
    #[serde(default)]
    pub renewals: Vec<SeedRenewal>,
    /// Content ids per enterprise catalog.
    #[serde(default)]
    pub catalogs: BTreeMap<EnterpriseCatalogId, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedAgreement {
    pub enterprise_customer_uuid: EnterpriseCustomerId,
    pub enterprise_customer_slug: EnterpriseSlug,
    pub enterprise_customer_name: String,
    #[serde(default)]
    pub default_enterprise_catalog_uuid: Option<EnterpriseCatalogId>,
    #[serde(default)]
    pub plans: Vec<PlanTerms>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedRenewal {
    pub enterprise_customer_slug: EnterpriseSlug,
    pub prior_plan_title: PlanTitle,
    pub salesforce_opportunity_id: SalesforceOpportunityId,
    pub number_of_licenses: u64,
    pub effective_date: NaiveDate,
    pub renewed_expiration_date: NaiveDate,
}

impl SeedFile {
    /// Read and parse a seed file.
    pub fn load(path: &Path) -> Result<Self, SeedError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, SeedError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Build a registry from the seed. Stops at the first invalid entry.
    pub fn into_registry(&self, now: Timestamp) -> Result<SubscriptionRegistry, SeedError> {
        let mut registry = SubscriptionRegistry::new();
        for seed in &self.agreements {
            let agreement = CustomerAgreement::new(
                seed.enterprise_customer_uuid,
                seed.enterprise_customer_slug.clone(),
                seed.enterprise_customer_name.clone(),
                seed.default_enterprise_catalog_uuid,
                now,
            );
            let agreement_id = registry.add_customer_agreement(agreement)?;
            for terms in &seed.plans {
                registry.add_subscription_plan(&agreement_id, terms.clone(), now)?;
            }
        }

        for seed in &self.renewals {
            let agreement = registry
                .agreement_by_slug(&seed.enterprise_customer_slug)
                .ok_or_else(|| SeedError::UnknownEnterprise(seed.enterprise_customer_slug.clone()))?;
            let prior = registry
                .plans_for_agreement(&agreement.uuid)
                .find(|p| p.title == seed.prior_plan_title)
                .map(|p| p.uuid)
                .ok_or_else(|| SeedError::UnknownPlan {
                    slug: seed.enterprise_customer_slug.clone(),
                    title: seed.prior_plan_title.to_string(),
                })?;
            let terms = RenewalTerms {
                salesforce_opportunity_id: seed.salesforce_opportunity_id.clone(),
                number_of_licenses: seed.number_of_licenses,
                effective_date: seed.effective_date,
                renewed_expiration_date: seed.renewed_expiration_date,
            };
            registry.add_renewal(&prior, terms, now)?;
        }

        tracing::info!(
            agreements = self.agreements.len(),
            renewals = self.renewals.len(),
            "seed loaded"
        );
        Ok(registry)
    }

    /// The catalog contents described by the seed.
    pub fn content_catalog(&self) -> StaticContentCatalog {
        let mut catalog = StaticContentCatalog::new();
        for (id, items) in &self.catalogs {
            catalog.insert(*id, items.iter().cloned());
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ContentCatalog;
    use std::io::Write;

    const SEED: &str = r#"
agreements:
  - enterprise_customer_uuid: 4f1c0b7e-5a1d-4a53-9d55-2d6a8c3b9e10
    enterprise_customer_slug: acme
    enterprise_customer_name: Acme Corp
    default_enterprise_catalog_uuid: 0d5e0a5c-8f4b-4c62-a8b4-5f0f7b7d2c11
    plans:
      - title: Annual
        start_date: 2026-01-01
        expiration_date: 2026-12-31
        salesforce_opportunity_id: 0060M00000abcdeXYZ
        netsuite_product_id: 101
        num_licenses: 50
        is_active: true
renewals:
  - enterprise_customer_slug: acme
    prior_plan_title: Annual
    salesforce_opportunity_id: 0060M00000zyxwvABC
    number_of_licenses: 60
    effective_date: 2027-01-01
    renewed_expiration_date: 2027-12-31
catalogs:
  0d5e0a5c-8f4b-4c62-a8b4-5f0f7b7d2c11:
    - course-v1:edX+DemoX+Demo_Course
"#;

    #[test]
    fn seed_builds_registry() {
        let seed = SeedFile::from_yaml_str(SEED).unwrap();
        let registry = seed.into_registry(Timestamp::now()).unwrap();
        let slug = EnterpriseSlug::new("acme").unwrap();
        let agreement = registry.agreement_by_slug(&slug).unwrap();
        let plans: Vec<_> = registry.plans_for_agreement(&agreement.uuid).collect();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].num_licenses(), 50);
        assert_eq!(plans[0].revoke_max_percentage, 5);
        assert_eq!(registry.future_renewals(&plans[0].uuid).len(), 1);
    }

    #[test]
    fn seed_catalog_contents() {
        let seed = SeedFile::from_yaml_str(SEED).unwrap();
        let catalog = seed.content_catalog();
        let id: EnterpriseCatalogId = "0d5e0a5c-8f4b-4c62-a8b4-5f0f7b7d2c11".parse().unwrap();
        assert!(catalog
            .contains_content_items(&id, &["course-v1:edX+DemoX+Demo_Course".to_string()])
            .unwrap());
    }

    #[test]
    fn load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SEED.as_bytes()).unwrap();
        let seed = SeedFile::load(file.path()).unwrap();
        assert_eq!(seed.agreements.len(), 1);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SeedFile::load(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, SeedError::Io { .. }));
    }

    #[test]
    fn invalid_field_is_parse_error() {
        let bad = SEED.replace("0060M00000abcdeXYZ", "short");
        assert!(matches!(
            SeedFile::from_yaml_str(&bad),
            Err(SeedError::Parse(_))
        ));
    }

    #[test]
    fn renewal_with_unknown_plan_is_rejected() {
        let bad = SEED.replace("prior_plan_title: Annual", "prior_plan_title: Quarterly");
        let seed = SeedFile::from_yaml_str(&bad).unwrap();
        assert!(matches!(
            seed.into_registry(Timestamp::now()),
            Err(SeedError::UnknownPlan { .. })
        ));
    }

    #[test]
    fn duplicate_slug_surfaces_registry_error() {
        let mut seed = SeedFile::from_yaml_str(SEED).unwrap();
        let mut copy = seed.agreements[0].clone();
        copy.enterprise_customer_uuid = EnterpriseCustomerId::new();
        copy.plans.clear();
        seed.agreements.push(copy);
        assert!(matches!(
            seed.into_registry(Timestamp::now()),
            Err(SeedError::Registry(RegistryError::DuplicateSlug(_)))
        ));
    }
}
