//! # Validated Field Types
//!
//! String newtypes that validate their contents at construction. Each one
//! also deserializes through its constructor so that an invalid seed file or
//! API payload is rejected at parse time instead of being silently accepted.

use serde::{Deserialize, Serialize};

use crate::constants::SALESFORCE_ID_LENGTH;
use crate::error::ValidationError;

/// Route `Deserialize` through the type's `new()` constructor.
macro_rules! impl_validating_deserialize {
    ($ty:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Shared accessor and `Display` impls for the string newtypes.
macro_rules! impl_str_newtype {
    ($ty:ident) => {
        impl $ty {
            /// The validated value.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Salesforce opportunity id
// ---------------------------------------------------------------------------

/// Salesforce Opportunity record id: exactly 18 alphanumeric characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SalesforceOpportunityId(String);

impl SalesforceOpportunityId {
    /// Validate and wrap an opportunity id.
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        let trimmed = s.trim();
        if trimmed.len() != SALESFORCE_ID_LENGTH
            || !trimmed.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ValidationError::InvalidSalesforceId(s));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl_str_newtype!(SalesforceOpportunityId);
impl_validating_deserialize!(SalesforceOpportunityId);

// ---------------------------------------------------------------------------
// Enterprise slug
// ---------------------------------------------------------------------------

/// URL path segment identifying an enterprise in the learner portal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EnterpriseSlug(String);

impl EnterpriseSlug {
    /// Maximum slug length.
    pub const MAX_LEN: usize = 128;

    /// Validate and wrap a slug.
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        let valid = !s.is_empty()
            && s.len() <= Self::MAX_LEN
            && s
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
        if !valid {
            return Err(ValidationError::InvalidEnterpriseSlug(s));
        }
        Ok(Self(s))
    }
}

impl_str_newtype!(EnterpriseSlug);
impl_validating_deserialize!(EnterpriseSlug);

// ---------------------------------------------------------------------------
// Email address
// ---------------------------------------------------------------------------

/// Learner email address, normalized to lowercase.
///
/// The check is structural only: one `@`, a non-empty local part, and a
/// dotted domain. Deliverability is not this type's concern.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EmailAddress(pub(crate) String);

impl EmailAddress {
    /// Maximum length per RFC 5321 path limits.
    pub const MAX_LEN: usize = 254;

    /// Validate, trim, and lowercase an address.
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = s.into();
        let normalized = raw.trim().to_ascii_lowercase();
        if normalized.len() > Self::MAX_LEN || normalized.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidEmail(raw));
        }
        let mut parts = normalized.split('@');
        let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(ValidationError::InvalidEmail(raw));
        };
        let domain_ok = domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && !domain.contains("..");
        if local.is_empty() || !domain_ok {
            return Err(ValidationError::InvalidEmail(raw));
        }
        Ok(Self(normalized))
    }
}

impl_str_newtype!(EmailAddress);
impl_validating_deserialize!(EmailAddress);

// ---------------------------------------------------------------------------
// Plan title
// ---------------------------------------------------------------------------

/// Human-readable subscription plan title.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PlanTitle(String);

impl PlanTitle {
    /// Maximum title length.
    pub const MAX_LEN: usize = 128;

    /// Validate and wrap a title. Surrounding whitespace is trimmed.
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.chars().count() > Self::MAX_LEN {
            return Err(ValidationError::InvalidPlanTitle(s));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl_str_newtype!(PlanTitle);
impl_validating_deserialize!(PlanTitle);
