//! # Revocation-Cap Subcommand
//!
//! Prints how many activated-license revocations a plan of a given size
//! may apply, using the same arithmetic the plans enforce.

use anyhow::{bail, Result};
use clap::Args;

use lm_core::revocations_allowed;

/// Arguments for the revocation-cap subcommand.
#[derive(Args, Debug)]
pub struct RevocationCapArgs {
    /// Number of non-revoked licenses in the plan.
    #[arg(long)]
    pub licenses: u64,

    /// Percentage of licenses that may be revoked (0-100).
    #[arg(long, default_value_t = 5)]
    pub percentage: u8,

    /// Revocations already applied.
    #[arg(long, default_value_t = 0)]
    pub applied: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevocationCap {
    pub allowed: u64,
    pub remaining: u64,
}

pub fn revocation_cap(args: &RevocationCapArgs) -> Result<RevocationCap> {
    if args.percentage > 100 {
        bail!("--percentage must be between 0 and 100, got {}", args.percentage);
    }
    let allowed = revocations_allowed(args.licenses, args.percentage);
    Ok(RevocationCap {
        allowed,
        remaining: allowed.saturating_sub(args.applied),
    })
}

/// Execute the revocation-cap subcommand. Exits 2 once the cap is reached.
pub fn run_revocation_cap(args: &RevocationCapArgs) -> Result<u8> {
    let cap = revocation_cap(args)?;
    println!("  licenses:   {}", args.licenses);
    println!("  percentage: {}%", args.percentage);
    println!("  allowed:    {}", cap.allowed);
    println!("  applied:    {}", args.applied);
    println!("  remaining:  {}", cap.remaining);
    Ok(if cap.remaining == 0 { 2 } else { 0 })
}
