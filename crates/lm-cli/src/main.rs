//! # lm CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lm_cli::activation::{run_activation_link, ActivationLinkArgs};
use lm_cli::expirations::{run_expirations, ExpirationsArgs};
use lm_cli::revocation::{run_revocation_cap, RevocationCapArgs};
use lm_cli::validate::{run_validate, ValidateArgs};

/// License manager command-line tool.
///
/// Validates seed files and answers plan questions offline with the same
/// rules the API enforces.
#[derive(Parser, Debug)]
#[command(name = "lm", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a seed file and report the agreements, plans, and licenses it creates.
    Validate(ValidateArgs),

    /// Compute the revocation cap of a plan.
    RevocationCap(RevocationCapArgs),

    /// Print the learner portal activation link for a license.
    ActivationLink(ActivationLinkArgs),

    /// List the ordered plan expirations of an enterprise.
    Expirations(ExpirationsArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Validate(args) => run_validate(args),
        Commands::RevocationCap(args) => run_revocation_cap(args),
        Commands::ActivationLink(args) => run_activation_link(args),
        Commands::Expirations(args) => run_expirations(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
