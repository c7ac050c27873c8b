//! # Validate Subcommand
//!
//! Loads a seed file through the same path the API bootstrap uses and
//! reports what it would create.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use lm_state::SubscriptionRegistry;

use crate::load_registry;

/// Arguments for the validate subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Seed file (YAML).
    pub seed: PathBuf,
}

/// Counts of the records a seed file creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub agreements: usize,
    pub plans: usize,
    pub licenses: usize,
    pub renewals: usize,
}

impl SeedSummary {
    pub fn of(registry: &SubscriptionRegistry) -> Self {
        Self {
            agreements: registry.customer_agreements().count(),
            plans: registry.subscription_plans().count(),
            licenses: registry
                .subscription_plans()
                .map(|p| p.num_licenses() as usize)
                .sum(),
            renewals: registry.renewals().count(),
        }
    }
}

/// Execute the validate subcommand.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let (_, registry) = load_registry(&args.seed)?;
    let summary = SeedSummary::of(&registry);
    tracing::debug!(?summary, "seed validated");

    println!("{}: OK", args.seed.display());
    println!("  agreements: {}", summary.agreements);
    println!("  plans:      {}", summary.plans);
    println!("  licenses:   {}", summary.licenses);
    println!("  renewals:   {}", summary.renewals);
    Ok(0)
}
