//! # Content Catalog
//!
//! Plans grant access to the content of one enterprise catalog. The catalog
//! itself lives in another service; [`ContentCatalog`] is the seam.
//! [`StaticContentCatalog`] is an in-memory implementation loaded from seed
//! data. The API crate provides the HTTP client for the enterprise catalog
//! service.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lm_core::EnterpriseCatalogId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A containment query must name at least one content id.
    #[error("no content ids given")]
    EmptyQuery,

    /// The catalog service could not be reached or failed.
    #[error("catalog service unavailable: {0}")]
    Unavailable(String),

    /// The catalog service answered with something other than a result.
    #[error("unexpected catalog service response: {0}")]
    BadResponse(String),
}

/// Answers whether an enterprise catalog includes content.
///
/// Implementations may block on I/O; async callers go through
/// `spawn_blocking`.
pub trait ContentCatalog: Send + Sync {
    /// True when every id in `content_ids` belongs to `catalog`.
    fn contains_content_items(
        &self,
        catalog: &EnterpriseCatalogId,
        content_ids: &[String],
    ) -> Result<bool, CatalogError>;
}

/// Catalog contents held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticContentCatalog {
    catalogs: BTreeMap<EnterpriseCatalogId, BTreeSet<String>>,
}

impl StaticContentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add content ids to a catalog, creating it if needed.
    pub fn insert<I, S>(&mut self, catalog: EnterpriseCatalogId, content_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.catalogs
            .entry(catalog)
            .or_default()
            .extend(content_ids.into_iter().map(Into::into));
    }
}

impl ContentCatalog for StaticContentCatalog {
    fn contains_content_items(
        &self,
        catalog: &EnterpriseCatalogId,
        content_ids: &[String],
    ) -> Result<bool, CatalogError> {
        if content_ids.is_empty() {
            return Err(CatalogError::EmptyQuery);
        }
        Ok(self
            .catalogs
            .get(catalog)
            .is_some_and(|items| content_ids.iter().all(|id| items.contains(id))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn all_ids_must_be_present() {
        let catalog_id = EnterpriseCatalogId::new();
        let mut catalog = StaticContentCatalog::new();
        catalog.insert(catalog_id, ["course-v1:edX+DemoX", "course-v1:edX+Intro"]);

        assert!(catalog
            .contains_content_items(&catalog_id, &ids(&["course-v1:edX+DemoX"]))
            .unwrap());
        assert!(!catalog
            .contains_content_items(&catalog_id, &ids(&["course-v1:edX+DemoX", "other"]))
            .unwrap());
    }

    #[test]
    fn unknown_catalog_contains_nothing() {
        let catalog = StaticContentCatalog::new();
        assert!(!catalog
            .contains_content_items(&EnterpriseCatalogId::new(), &ids(&["x"]))
            .unwrap());
    }

    #[test]
    fn empty_query_is_an_error() {
        let catalog = StaticContentCatalog::new();
        assert_eq!(
            catalog.contains_content_items(&EnterpriseCatalogId::new(), &[]),
            Err(CatalogError::EmptyQuery)
        );
    }
}
