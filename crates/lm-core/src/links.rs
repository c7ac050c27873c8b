//! # Learner Portal Links
//!
//! Builds the learner-facing URLs that notifications carry: the enterprise
//! learner portal and the per-license activation link.
//!
//! ```text
//! {portal_base}/{enterprise_slug}
//! {portal_base}/{enterprise_slug}/licenses/{activation_key}/activate
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::ActivationKey;
use crate::validated::{EmailAddress, EnterpriseSlug};

const DEFAULT_PORTAL_BASE_URL: &str = "http://localhost:8734";
const DEFAULT_HELP_CENTER_URL: &str = "https://support.example.com/hc";
const DEFAULT_SUPPORT_EMAIL: &str = "customersuccess@example.com";

/// Where learner-facing links point and who receives operator notices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Base URL of the enterprise learner portal, without trailing slash.
    pub learner_portal_base_url: String,
    /// Help-center URL included in every notification.
    pub help_center_url: String,
    /// Recipient of revocation-cap notices.
    pub support_email: EmailAddress,
}

impl PortalConfig {
    /// Build a configuration, normalizing the portal base URL.
    pub fn new(
        learner_portal_base_url: impl Into<String>,
        help_center_url: impl Into<String>,
        support_email: EmailAddress,
    ) -> Result<Self, ValidationError> {
        let base = learner_portal_base_url.into();
        let base = base.trim().trim_end_matches('/').to_string();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ValidationError::InvalidPortalConfig(format!(
                "learner portal base URL must be http(s), got {base:?}"
            )));
        }
        let help_center_url = help_center_url.into().trim().to_string();
        if help_center_url.is_empty() {
            return Err(ValidationError::InvalidPortalConfig(
                "help center URL must not be empty".to_string(),
            ));
        }
        Ok(Self {
            learner_portal_base_url: base,
            help_center_url,
            support_email,
        })
    }

    /// Read configuration from the process environment.
    ///
    /// - `ENTERPRISE_LEARNER_PORTAL_BASE_URL`
    /// - `SUPPORT_SITE_URL`
    /// - `CUSTOMER_SUPPORT_EMAIL`
    ///
    /// Unset variables fall back to local-development defaults.
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ValidationError> {
        let base = lookup("ENTERPRISE_LEARNER_PORTAL_BASE_URL")
            .unwrap_or_else(|| DEFAULT_PORTAL_BASE_URL.to_string());
        let help =
            lookup("SUPPORT_SITE_URL").unwrap_or_else(|| DEFAULT_HELP_CENTER_URL.to_string());
        let email = lookup("CUSTOMER_SUPPORT_EMAIL")
            .unwrap_or_else(|| DEFAULT_SUPPORT_EMAIL.to_string());
        Self::new(base, help, EmailAddress::new(email)?)
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            learner_portal_base_url: DEFAULT_PORTAL_BASE_URL.to_string(),
            help_center_url: DEFAULT_HELP_CENTER_URL.to_string(),
            support_email: EmailAddress(DEFAULT_SUPPORT_EMAIL.to_string()),
        }
    }
}

/// Link to the learner portal of an enterprise. No trailing slash.
pub fn learner_portal_url(config: &PortalConfig, slug: &EnterpriseSlug) -> String {
    format!("{}/{}", config.learner_portal_base_url, slug)
}

/// Activation link sent to a learner for an assigned license.
pub fn license_activation_link(
    config: &PortalConfig,
    slug: &EnterpriseSlug,
    activation_key: &ActivationKey,
) -> String {
    format!(
        "{}/licenses/{}/activate",
        learner_portal_url(config, slug),
        activation_key
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::str::FromStr;

    fn config() -> PortalConfig {
        PortalConfig::new(
            "https://portal.example.com/",
            "https://help.example.com",
            EmailAddress::new("support@example.com").unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn portal_url_has_no_trailing_slash() {
        let slug = EnterpriseSlug::new("acme").unwrap();
        assert_eq!(learner_portal_url(&config(), &slug), "https://portal.example.com/acme");
    }

    #[test]
    fn activation_link_format() {
        let slug = EnterpriseSlug::new("acme").unwrap();
        let key = ActivationKey::from_str("00000000-0000-0000-0000-000000000001").unwrap();
        assert_eq!(
            license_activation_link(&config(), &slug, &key),
            "https://portal.example.com/acme/licenses/00000000-0000-0000-0000-000000000001/activate"
        );
    }

    #[test]
    fn rejects_non_http_base() {
        let err = PortalConfig::new(
            "ftp://portal",
            "https://help",
            EmailAddress::new("a@example.com").unwrap(),
        );
        assert!(err.is_err());
    }

    #[test]
    fn from_lookup_uses_defaults_and_overrides() {
        let mut vars = HashMap::new();
        vars.insert("ENTERPRISE_LEARNER_PORTAL_BASE_URL", "https://learn.example.org//");
        let cfg = PortalConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.learner_portal_base_url, "https://learn.example.org");
        assert_eq!(cfg.help_center_url, DEFAULT_HELP_CENTER_URL);
        assert_eq!(cfg.support_email.as_str(), DEFAULT_SUPPORT_EMAIL);
    }

    #[test]
    fn from_lookup_rejects_bad_email() {
        let cfg = PortalConfig::from_lookup(|k| {
            (k == "CUSTOMER_SUPPORT_EMAIL").then(|| "nobody".to_string())
        });
        assert!(cfg.is_err());
    }

    #[test]
    fn default_matches_from_empty_lookup() {
        assert_eq!(PortalConfig::from_lookup(|_| None).unwrap(), PortalConfig::default());
    }
}
