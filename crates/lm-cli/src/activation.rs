//! # Activation-Link Subcommand

use anyhow::{Context, Result};
use clap::Args;

use lm_core::{license_activation_link, ActivationKey, EnterpriseSlug, PortalConfig};

/// Arguments for the activation-link subcommand.
#[derive(Args, Debug)]
pub struct ActivationLinkArgs {
    /// Enterprise customer slug.
    #[arg(long)]
    pub slug: String,

    /// License activation key (UUID).
    #[arg(long)]
    pub key: String,

    /// Learner portal base URL. Defaults to ENTERPRISE_LEARNER_PORTAL_BASE_URL
    /// or the local development portal.
    #[arg(long)]
    pub portal_base: Option<String>,
}

pub fn activation_link(args: &ActivationLinkArgs) -> Result<String> {
    let slug = EnterpriseSlug::new(args.slug.as_str())?;
    let key: ActivationKey = args
        .key
        .parse()
        .with_context(|| format!("invalid activation key {:?}", args.key))?;
    let env = PortalConfig::from_env()?;
    let config = match &args.portal_base {
        Some(base) => PortalConfig::new(base.as_str(), env.help_center_url, env.support_email)?,
        None => env,
    };
    Ok(license_activation_link(&config, &slug, &key))
}

/// Execute the activation-link subcommand.
pub fn run_activation_link(args: &ActivationLinkArgs) -> Result<u8> {
    println!("{}", activation_link(args)?);
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "6f1c3f2e-6a55-4d9f-8a9e-1c9d0c1b2a3f";

    #[test]
    fn explicit_portal_base() {
        let args = ActivationLinkArgs {
            slug: "acme".into(),
            key: KEY.into(),
            portal_base: Some("https://portal.example.com/".into()),
        };
        assert_eq!(
            activation_link(&args).unwrap(),
            format!("https://portal.example.com/acme/licenses/{KEY}/activate")
        );
    }

    #[test]
    fn bad_key_is_error() {
        let args = ActivationLinkArgs {
            slug: "acme".into(),
            key: "not-a-uuid".into(),
            portal_base: Some("https://portal.example.com".into()),
        };
        let err = activation_link(&args).unwrap_err();
        assert!(err.to_string().contains("not-a-uuid"));
    }

    #[test]
    fn non_http_portal_is_error() {
        let args = ActivationLinkArgs {
            slug: "acme".into(),
            key: KEY.into(),
            portal_base: Some("ftp://portal.example.com".into()),
        };
        assert!(activation_link(&args).is_err());
    }
}
