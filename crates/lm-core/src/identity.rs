//! # Identifier Newtypes
//!
//! UUID-backed identifiers for every record kind in the license manager.
//! Each identifier is a distinct type, so a [`LicenseId`] cannot be passed
//! where a [`SubscriptionPlanId`] is expected. All of them serialize as a
//! bare UUID string.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a UUID newtype with the standard constructor and conversion set.
macro_rules! uuid_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::from_str(s).map(Self)
            }
        }
    };
}

uuid_newtype!(
    /// Identifier of a customer agreement (one per enterprise customer).
    CustomerAgreementId
);

uuid_newtype!(
    /// Identifier of a subscription plan.
    SubscriptionPlanId
);

uuid_newtype!(
    /// Identifier of an individual license.
    LicenseId
);

uuid_newtype!(
    /// Identifier of a scheduled subscription renewal.
    RenewalId
);

uuid_newtype!(
    /// Per-assignment secret embedded in the activation link.
    ///
    /// A fresh key is generated every time a license is assigned, so a link
    /// sent to a previous holder stops working after the license is reset.
    ActivationKey
);

uuid_newtype!(
    /// Identifier of the enterprise customer in the enterprise service.
    EnterpriseCustomerId
);

uuid_newtype!(
    /// Identifier of an enterprise content catalog.
    EnterpriseCatalogId
);
