//! # lm-core: Foundational Types for the License Manager
//!
//! Every other crate in the workspace depends on `lm-core`; it depends on
//! nothing internal. It defines the primitives the subscription domain is
//! built from.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `CustomerAgreementId`,
//!    `SubscriptionPlanId`, `LicenseId`, `RenewalId`, `ActivationKey`. You
//!    cannot pass a license id where a plan id is expected.
//!
//! 2. **Validated field types.** `SalesforceOpportunityId`, `EnterpriseSlug`,
//!    `EmailAddress`, and `PlanTitle` validate at construction and at
//!    deserialization. An invalid value never reaches the domain model.
//!
//! 3. **UTC-only timestamps.** [`Timestamp`] is UTC with seconds precision.
//!    Calendar arithmetic uses `chrono::NaiveDate`.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `lm-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod batch;
pub mod constants;
pub mod error;
pub mod identity;
pub mod links;
pub mod quota;
pub mod temporal;
pub mod validated;

// Re-export primary types for ergonomic imports.
pub use batch::chunks;
pub use error::{LmError, ValidationError};
pub use identity::{
    ActivationKey, CustomerAgreementId, EnterpriseCatalogId, EnterpriseCustomerId, LicenseId,
    RenewalId, SubscriptionPlanId,
};
pub use links::{learner_portal_url, license_activation_link, PortalConfig};
pub use quota::revocations_allowed;
pub use temporal::{days_until, Timestamp};
pub use validated::{EmailAddress, EnterpriseSlug, PlanTitle, SalesforceOpportunityId};
