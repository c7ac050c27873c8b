//! # lm-cli: License Manager Command-Line Tool
//!
//! Offline helpers over the same domain crates the API serves from.
//!
//! ## Subcommands
//!
//! - `lm validate`: Load a seed file and report what it would create.
//! - `lm revocation-cap`: Revocations a plan of a given size may apply.
//! - `lm activation-link`: The learner portal link for an activation key.
//! - `lm expirations`: Ordered plan expirations of one enterprise.
//!
//! ```bash
//! lm validate seed.yaml
//! lm revocation-cap --licenses 250 --percentage 5 --applied 3
//! lm activation-link --slug acme --key 6f1c3f2e-6a55-4d9f-8a9e-1c9d0c1b2a3f
//! lm expirations seed.yaml --slug acme --today 2026-06-01
//! ```
//!
//! Handlers return a process exit code and leave printing of errors to
//! `main`.

pub mod activation;
pub mod expirations;
pub mod revocation;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use lm_core::Timestamp;
use lm_state::{SeedFile, SubscriptionRegistry};

/// Load a seed file and build the registry it describes.
pub fn load_registry(path: &Path) -> Result<(SeedFile, SubscriptionRegistry)> {
    let seed = SeedFile::load(path)?;
    let registry = seed
        .into_registry(Timestamp::now())
        .with_context(|| format!("seed file {} is inconsistent", path.display()))?;
    Ok((seed, registry))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::Write;

    pub const SEED: &str = r#"
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
      - title: Pilot
        start_date: 2025-01-01
        expiration_date: 2025-06-30
        salesforce_opportunity_id: 0060M00000abcdeXYZ
        netsuite_product_id: 101
        num_licenses: 5
renewals:
  - enterprise_customer_slug: acme
    prior_plan_title: Annual
    salesforce_opportunity_id: 0060M00000zyxwvABC
    number_of_licenses: 60
    effective_date: 2027-01-01
    renewed_expiration_date: 2027-12-31
"#;

    pub fn seed_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }
}
