//! # lm-state: Subscription Domain Model
//!
//! Licenses, subscription plans, customer agreements, renewals, and the
//! registry that ties them together.
//!
//! ## License lifecycle
//!
//! ```text
//! Unassigned ──assign──▶ Assigned ──activate──▶ Activated
//!                            └──────revoke──────────┴──▶ Revoked
//! ```
//!
//! Transitions are methods on [`License`] that check the current state and
//! append a history record. Plan-wide rules (email uniqueness, capacity, the
//! revocation cap) live on [`SubscriptionPlan`]; rules that span plans
//! (renewals, expiration, retirement) live on [`SubscriptionRegistry`].
//!
//! Nothing here performs I/O except [`SeedFile::load`].

pub mod agreement;
pub mod catalog;
pub mod license;
pub mod plan;
pub mod registry;
pub mod renewal;
pub mod roles;
pub mod seed;

pub use agreement::{order_expirations, CustomerAgreement, PlanExpiration};
pub use catalog::{CatalogError, ContentCatalog, StaticContentCatalog};
pub use license::{License, LicenseError, LicenseStatus, LicenseTransitionRecord};
pub use plan::{PlanError, PlanTerms, RevocationOutcome, StatusOverview, SubscriptionPlan};
pub use registry::{ExpirationReport, LearnerLicense, RegistryError, SubscriptionRegistry};
pub use renewal::{RenewalError, RenewalTerms, SubscriptionPlanRenewal};
pub use roles::{FeatureRole, Permission, RoleAssignment, RoleError, SystemRole};
pub use seed::{SeedAgreement, SeedError, SeedFile, SeedRenewal};
