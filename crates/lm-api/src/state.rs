//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Architecture
//!
//! - **Registry**: the whole subscription domain behind one
//!   `parking_lot::RwLock`. Handlers never hold the lock across `.await`.
//! - **Content catalog**: answers catalog containment queries. The HTTP
//!   client when `ENTERPRISE_CATALOG_URL` is set, otherwise the seed's
//!   static catalog.
//! - **Mailer**: receives composed notifications after the lock is released.
//! - **Metrics**: the Prometheus handle rendered at `/metrics`, when a
//!   recorder is installed.

use std::path::PathBuf;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::RwLock;
use thiserror::Error;

use lm_core::constants::EXPOSE_LICENSE_ACTIVATION_KEY_OVER_API;
use lm_core::{PortalConfig, Timestamp, ValidationError};
use lm_notify::{Mailer, Outbox};
use lm_state::{
    CatalogError, ContentCatalog, SeedError, SeedFile, StaticContentCatalog, SubscriptionRegistry,
};

use crate::catalog::{EnterpriseCatalogConfig, HttpContentCatalog};

const DEFAULT_PORT: u16 = 8080;

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid PORT value: {0:?}")]
    InvalidPort(String),

    #[error(transparent)]
    Portal(#[from] ValidationError),

    #[error(transparent)]
    Seed(#[from] SeedError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Runtime configuration read from the environment.
///
/// Custom `Debug` redacts the auth token.
#[derive(Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Shared bearer secret. `None` disables authentication.
    pub auth_token: Option<String>,
    pub portal: PortalConfig,
    /// YAML file loaded into the registry at startup.
    pub seed_file: Option<PathBuf>,
    /// Include activation keys in license responses.
    pub expose_activation_keys: bool,
    /// Enterprise catalog service. `None` keeps catalog queries local.
    pub enterprise_catalog: Option<EnterpriseCatalogConfig>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("portal", &self.portal)
            .field("seed_file", &self.seed_file)
            .field("expose_activation_keys", &self.expose_activation_keys)
            .field("enterprise_catalog", &self.enterprise_catalog)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            auth_token: None,
            portal: PortalConfig::default(),
            seed_file: None,
            expose_activation_keys: false,
            enterprise_catalog: None,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    ///
    /// | Variable                                 | Default |
    /// |------------------------------------------|---------|
    /// | `PORT`                                   | 8080    |
    /// | `AUTH_TOKEN`                             | unset   |
    /// | `LM_SEED_FILE`                           | unset   |
    /// | `EXPOSE_LICENSE_ACTIVATION_KEY_OVER_API` | false   |
    ///
    /// Portal settings are read by [`PortalConfig::from_lookup`], catalog
    /// service settings by [`EnterpriseCatalogConfig::from_lookup`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?,
            None => DEFAULT_PORT,
        };
        let auth_token = lookup("AUTH_TOKEN").filter(|t| !t.is_empty());
        let seed_file = lookup("LM_SEED_FILE")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        let expose_activation_keys = lookup(&EXPOSE_LICENSE_ACTIVATION_KEY_OVER_API.to_uppercase())
            .is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true"));
        let portal = PortalConfig::from_lookup(&lookup)?;
        let enterprise_catalog = EnterpriseCatalogConfig::from_lookup(&lookup);
        Ok(Self {
            port,
            auth_token,
            portal,
            seed_file,
            expose_activation_keys,
            enterprise_catalog,
        })
    }
}

// ─── State ───────────────────────────────────────────────────────────

/// Shared application state. Cloning shares every component.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub registry: Arc<RwLock<SubscriptionRegistry>>,
    pub catalog: Arc<dyn ContentCatalog>,
    pub mailer: Arc<dyn Mailer>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Empty registry, empty catalog, in-memory outbox, default config.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self {
            config,
            registry: Arc::new(RwLock::new(SubscriptionRegistry::new())),
            catalog: Arc::new(StaticContentCatalog::new()),
            mailer: Arc::new(Outbox::new()),
            metrics: None,
        }
    }

    /// Build state from configuration: load the seed file if one is set and
    /// connect the catalog service if one is configured.
    pub fn bootstrap(config: AppConfig) -> Result<Self, ConfigError> {
        let remote = config
            .enterprise_catalog
            .clone()
            .map(HttpContentCatalog::new)
            .transpose()?;

        let mut state = Self::with_config(config);
        if let Some(path) = state.config.seed_file.clone() {
            let seed = SeedFile::load(&path)?;
            let registry = seed.into_registry(Timestamp::now())?;
            tracing::info!(
                path = %path.display(),
                agreements = registry.customer_agreements().count(),
                plans = registry.subscription_plans().count(),
                "registry seeded"
            );
            state = state
                .with_registry(registry)
                .with_catalog(seed.content_catalog());
        }
        if let Some(catalog) = remote {
            tracing::info!(base_url = catalog.base_url(), "using enterprise catalog service");
            state = state.with_catalog(catalog);
        }
        Ok(state)
    }

    pub fn with_registry(mut self, registry: SubscriptionRegistry) -> Self {
        self.registry = Arc::new(RwLock::new(registry));
        self
    }

    pub fn with_catalog(mut self, catalog: impl ContentCatalog + 'static) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    pub fn with_mailer(mut self, mailer: impl Mailer + 'static) -> Self {
        self.mailer = Arc::new(mailer);
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_environment_empty() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.auth_token.is_none());
        assert!(config.seed_file.is_none());
        assert!(!config.expose_activation_keys);
        assert!(config.enterprise_catalog.is_none());
        assert_eq!(config.portal, PortalConfig::default());
    }

    #[test]
    fn reads_every_variable() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PORT", "9000"),
            ("AUTH_TOKEN", "s3cret"),
            ("LM_SEED_FILE", "/etc/lm/seed.yaml"),
            ("EXPOSE_LICENSE_ACTIVATION_KEY_OVER_API", "true"),
            ("ENTERPRISE_LEARNER_PORTAL_BASE_URL", "https://learn.example.com/"),
            ("ENTERPRISE_CATALOG_URL", "https://catalog.example.com"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.auth_token.as_deref(), Some("s3cret"));
        assert_eq!(config.seed_file, Some(PathBuf::from("/etc/lm/seed.yaml")));
        assert!(config.expose_activation_keys);
        assert_eq!(config.portal.learner_portal_base_url, "https://learn.example.com");
        assert_eq!(
            config.enterprise_catalog,
            Some(EnterpriseCatalogConfig::new("https://catalog.example.com"))
        );
    }

    #[test]
    fn invalid_port_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort(_)));
    }

    #[test]
    fn empty_token_disables_auth() {
        let config = AppConfig::from_lookup(lookup(&[("AUTH_TOKEN", "")])).unwrap();
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn debug_redacts_token() {
        let config = AppConfig {
            auth_token: Some("super-secret".into()),
            ..AppConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn bootstrap_loads_seed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
agreements:
  - enterprise_customer_uuid: 5c4f3b1e-2d0a-4f59-9a62-3f7cbe3b8f10
    enterprise_customer_slug: acme
    enterprise_customer_name: Acme Corp
    default_enterprise_catalog_uuid: 0d9a1f8e-6f43-4a0e-8d0e-0c1b2a3d4e5f
    plans:
      - title: Annual
        start_date: 2026-01-01
        expiration_date: 2026-12-31
        salesforce_opportunity_id: 0060M00000abcdeXYZ
        netsuite_product_id: 1
        is_active: true
        num_licenses: 3
"#
        )
        .unwrap();
        let config = AppConfig {
            seed_file: Some(file.path().to_path_buf()),
            ..AppConfig::default()
        };
        let state = AppState::bootstrap(config).unwrap();
        let registry = state.registry.read();
        assert_eq!(registry.customer_agreements().count(), 1);
        let plan = registry.subscription_plans().next().unwrap();
        assert_eq!(plan.num_licenses(), 3);
    }

    #[tokio::test]
    async fn bootstrap_selects_catalog_service() {
        let config = AppConfig {
            enterprise_catalog: Some(EnterpriseCatalogConfig::new("http://127.0.0.1:9")),
            ..AppConfig::default()
        };
        let state = AppState::bootstrap(config).unwrap();
        let catalog = Arc::clone(&state.catalog);
        let result = tokio::task::spawn_blocking(move || {
            catalog.contains_content_items(&lm_core::EnterpriseCatalogId::new(), &["x".to_string()])
        })
        .await
        .unwrap();
        assert!(matches!(result, Err(CatalogError::Unavailable(_))));
    }

    #[test]
    fn bootstrap_reports_missing_seed() {
        let config = AppConfig {
            seed_file: Some(PathBuf::from("/nonexistent/seed.yaml")),
            ..AppConfig::default()
        };
        assert!(matches!(
            AppState::bootstrap(config),
            Err(ConfigError::Seed(SeedError::Io { .. }))
        ));
    }
}
