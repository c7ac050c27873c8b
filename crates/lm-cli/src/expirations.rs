//! # Expirations Subcommand
//!
//! Lists the plan expirations of one enterprise in the order the customer
//! agreement reports them: active plans first, furthest expiration
//! (counting scheduled renewals) leading.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use serde_json::json;

use lm_core::{EnterpriseSlug, Timestamp};
use lm_state::SubscriptionRegistry;

use crate::load_registry;

/// Arguments for the expirations subcommand.
#[derive(Args, Debug)]
pub struct ExpirationsArgs {
    /// Seed file (YAML).
    pub seed: PathBuf,

    /// Enterprise customer slug.
    #[arg(long)]
    pub slug: String,

    /// Reference date (YYYY-MM-DD). Defaults to today in UTC.
    #[arg(long)]
    pub today: Option<NaiveDate>,

    /// Emit JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// One row of the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpirationRow {
    pub title: String,
    pub expiration_date: NaiveDate,
    pub days_until_expiration: i64,
    pub days_until_expiration_including_renewals: i64,
    pub is_active: bool,
}

pub fn expiration_rows(
    registry: &SubscriptionRegistry,
    slug: &EnterpriseSlug,
    today: NaiveDate,
) -> Result<Vec<ExpirationRow>> {
    let agreement = registry
        .agreement_by_slug(slug)
        .with_context(|| format!("no customer agreement for enterprise {slug}"))?;
    registry
        .ordered_subscription_plan_expirations(&agreement.uuid, today)?
        .into_iter()
        .map(|e| -> Result<ExpirationRow> {
            let plan = registry.subscription_plan(&e.subscription_id)?;
            Ok(ExpirationRow {
                title: plan.title.to_string(),
                expiration_date: plan.expiration_date,
                days_until_expiration: e.days_until_expiration,
                days_until_expiration_including_renewals: e.days_until_expiration_including_renewals,
                is_active: e.is_active,
            })
        })
        .collect()
}

/// Execute the expirations subcommand.
pub fn run_expirations(args: &ExpirationsArgs) -> Result<u8> {
    let (_, registry) = load_registry(&args.seed)?;
    let slug = EnterpriseSlug::new(args.slug.as_str())?;
    let today = args.today.unwrap_or_else(|| Timestamp::now().date_naive());
    let rows = expiration_rows(&registry, &slug, today)?;

    if args.json {
        let value: Vec<_> = rows
            .iter()
            .map(|r| {
                json!({
                    "title": r.title,
                    "expiration_date": r.expiration_date,
                    "days_until_expiration": r.days_until_expiration,
                    "days_until_expiration_including_renewals": r.days_until_expiration_including_renewals,
                    "is_active": r.is_active,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(0);
    }

    println!("Plan expirations for {slug} as of {today}:");
    println!();
    for r in &rows {
        println!(
            "  {:<32} {}  {:>6} days ({:>6} with renewals){}",
            r.title,
            r.expiration_date,
            r.days_until_expiration,
            r.days_until_expiration_including_renewals,
            if r.is_active { "" } else { "  [inactive]" }
        );
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn active_plan_leads_and_counts_renewal() {
        let file = fixtures::seed_file(fixtures::SEED);
        let (_, registry) = load_registry(file.path()).unwrap();
        let slug = EnterpriseSlug::new("acme").unwrap();
        let rows = expiration_rows(&registry, &slug, date("2026-06-01")).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].title, "Annual");
        assert_eq!(rows[0].days_until_expiration, 213);
        assert_eq!(rows[0].days_until_expiration_including_renewals, 578);
        assert!(rows[0].is_active);
        assert_eq!(rows[1].title, "Pilot");
        assert_eq!(rows[1].days_until_expiration, -336);
        assert!(!rows[1].is_active);
    }

    #[test]
    fn unknown_enterprise_is_error() {
        let file = fixtures::seed_file(fixtures::SEED);
        let (_, registry) = load_registry(file.path()).unwrap();
        let slug = EnterpriseSlug::new("globex").unwrap();
        assert!(expiration_rows(&registry, &slug, date("2026-06-01")).is_err());
    }

    #[test]
    fn json_output_exits_zero() {
        let file = fixtures::seed_file(fixtures::SEED);
        let args = ExpirationsArgs {
            seed: file.path().to_path_buf(),
            slug: "acme".into(),
            today: Some(date("2026-06-01")),
            json: true,
        };
        assert_eq!(run_expirations(&args).unwrap(), 0);
    }
}
