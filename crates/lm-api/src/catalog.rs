//! # Enterprise Catalog HTTP Client
//!
//! [`ContentCatalog`] backed by the enterprise catalog service:
//!
//! ```text
//! GET {base_url}/api/v1/enterprise-catalogs/{catalog}/contains_content_items/?course_run_ids=...
//! → {"contains_content_items": true}
//! ```
//!
//! ## Error Handling
//!
//! Transport failures, timeouts, and 5xx answers become
//! [`CatalogError::Unavailable`]. Other non-success answers and bodies
//! that do not parse become [`CatalogError::BadResponse`]. A 404 means the
//! catalog does not exist and so contains nothing.
//!
//! The trait method blocks on the current Tokio runtime and must run on a
//! blocking thread (`tokio::task::spawn_blocking`).

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;

use lm_core::EnterpriseCatalogId;
use lm_state::{CatalogError, ContentCatalog};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the enterprise catalog service.
///
/// Custom `Debug` redacts the API token.
#[derive(Clone, PartialEq, Eq)]
pub struct EnterpriseCatalogConfig {
    /// Service root, e.g. `https://catalog.example.com`.
    pub base_url: String,
    /// Bearer token sent on every request.
    pub api_token: Option<String>,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for EnterpriseCatalogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnterpriseCatalogConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl EnterpriseCatalogConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// `ENTERPRISE_CATALOG_URL` and the optional
    /// `ENTERPRISE_CATALOG_API_TOKEN`. `None` when no URL is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let base_url = lookup("ENTERPRISE_CATALOG_URL").filter(|u| !u.trim().is_empty())?;
        Some(Self {
            api_token: lookup("ENTERPRISE_CATALOG_API_TOKEN").filter(|t| !t.is_empty()),
            ..Self::new(base_url.trim())
        })
    }
}

#[derive(Debug, Deserialize)]
struct ContainsContentItems {
    contains_content_items: bool,
}

/// HTTP client for catalog containment queries.
#[derive(Debug)]
pub struct HttpContentCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl HttpContentCatalog {
    pub fn new(config: EnterpriseCatalogConfig) -> Result<Self, CatalogError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &config.api_token {
            headers.insert(
                reqwest::header::AUTHORIZATION,
                reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|_| CatalogError::Unavailable("invalid API token characters".into()))?,
            );
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| CatalogError::Unavailable(format!("failed to build HTTP client: {e}")))?;
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch(
        &self,
        catalog: &EnterpriseCatalogId,
        content_ids: &[String],
    ) -> Result<bool, CatalogError> {
        let url = format!(
            "{}/api/v1/enterprise-catalogs/{}/contains_content_items/",
            self.base_url, catalog
        );
        let query: Vec<(&str, &str)> = content_ids
            .iter()
            .map(|id| ("course_run_ids", id.as_str()))
            .collect();

        let resp = self.client.get(&url).query(&query).send().await.map_err(|e| {
            if e.is_timeout() {
                CatalogError::Unavailable(format!("GET {url} timed out"))
            } else {
                CatalogError::Unavailable(format!("GET {url}: {e}"))
            }
        })?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!(%catalog, "catalog not found upstream");
            return Ok(false);
        }
        if status.is_server_error() {
            return Err(CatalogError::Unavailable(format!("GET {url}: HTTP {status}")));
        }
        if !status.is_success() {
            return Err(CatalogError::BadResponse(format!("GET {url}: HTTP {status}")));
        }

        let body: ContainsContentItems = resp
            .json()
            .await
            .map_err(|e| CatalogError::BadResponse(format!("GET {url}: {e}")))?;
        Ok(body.contains_content_items)
    }
}

impl ContentCatalog for HttpContentCatalog {
    fn contains_content_items(
        &self,
        catalog: &EnterpriseCatalogId,
        content_ids: &[String],
    ) -> Result<bool, CatalogError> {
        if content_ids.is_empty() {
            return Err(CatalogError::EmptyQuery);
        }
        let rt = tokio::runtime::Handle::try_current().map_err(|_| {
            CatalogError::Unavailable("no async runtime available for HTTP request".into())
        })?;
        rt.block_on(self.fetch(catalog, content_ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn config_absent_without_url() {
        assert!(EnterpriseCatalogConfig::from_lookup(lookup(&[])).is_none());
        assert!(EnterpriseCatalogConfig::from_lookup(lookup(&[("ENTERPRISE_CATALOG_URL", " ")])).is_none());
    }

    #[test]
    fn config_reads_url_and_token() {
        let config = EnterpriseCatalogConfig::from_lookup(lookup(&[
            ("ENTERPRISE_CATALOG_URL", "https://catalog.example.com/"),
            ("ENTERPRISE_CATALOG_API_TOKEN", "tok"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "https://catalog.example.com/");
        assert_eq!(config.api_token.as_deref(), Some("tok"));
        assert_eq!(config.timeout_secs, 30);
        assert!(format!("{config:?}").contains("[REDACTED]"));
    }

    #[test]
    fn trailing_slash_trimmed() {
        let catalog =
            HttpContentCatalog::new(EnterpriseCatalogConfig::new("https://catalog.example.com/")).unwrap();
        assert_eq!(catalog.base_url(), "https://catalog.example.com");
    }

    #[test]
    fn empty_query_rejected_before_any_request() {
        let catalog =
            HttpContentCatalog::new(EnterpriseCatalogConfig::new("http://127.0.0.1:9")).unwrap();
        assert_eq!(
            catalog.contains_content_items(&EnterpriseCatalogId::new(), &[]),
            Err(CatalogError::EmptyQuery)
        );
    }

    #[test]
    fn no_runtime_is_unavailable() {
        let catalog =
            HttpContentCatalog::new(EnterpriseCatalogConfig::new("http://127.0.0.1:9")).unwrap();
        assert!(matches!(
            catalog.contains_content_items(&EnterpriseCatalogId::new(), &["x".to_string()]),
            Err(CatalogError::Unavailable(_))
        ));
    }
}
