//! # Roles and Permissions
//!
//! Enterprise role-based access control. Upstream identity systems grant
//! *system* roles (`enterprise_admin`, `enterprise_learner`,
//! `enterprise_openedx_operator`); each maps onto a subscriptions *feature*
//! role scoped to one enterprise or, for operators, to every enterprise.
//!
//! | System role                   | Feature role | Context         |
//! |-------------------------------|--------------|-----------------|
//! | `enterprise_admin`            | admin        | enterprise uuid |
//! | `enterprise_learner`          | learner      | enterprise uuid |
//! | `enterprise_openedx_operator` | admin        | `*`             |

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lm_core::constants::{
    ALL_ACCESS_CONTEXT, SUBSCRIPTIONS_ADMIN_ACCESS_PERMISSION,
    SUBSCRIPTIONS_ADMIN_LEARNER_ACCESS_PERMISSION, SUBSCRIPTIONS_ADMIN_ROLE,
    SUBSCRIPTIONS_LEARNER_ROLE, SYSTEM_ENTERPRISE_ADMIN_ROLE, SYSTEM_ENTERPRISE_LEARNER_ROLE,
    SYSTEM_ENTERPRISE_OPERATOR_ROLE,
};
use lm_core::EnterpriseCustomerId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoleError {
    #[error("unknown system role: {0:?}")]
    UnknownSystemRole(String),

    /// Enterprise-scoped roles must name an enterprise.
    #[error("role {0} requires an enterprise context")]
    MissingContext(SystemRole),
}

// ─── Roles ───────────────────────────────────────────────────────────

/// Subscriptions feature role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureRole {
    #[serde(rename = "enterprise_subscriptions_admin")]
    SubscriptionsAdmin,
    #[serde(rename = "enterprise_subscriptions_learner")]
    SubscriptionsLearner,
}

impl FeatureRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubscriptionsAdmin => SUBSCRIPTIONS_ADMIN_ROLE,
            Self::SubscriptionsLearner => SUBSCRIPTIONS_LEARNER_ROLE,
        }
    }

    /// Whether this role carries `permission`.
    pub fn grants(&self, permission: Permission) -> bool {
        match self {
            Self::SubscriptionsAdmin => true,
            Self::SubscriptionsLearner => permission == Permission::LearnerOrAdminAccess,
        }
    }
}

/// Role granted by the enterprise identity system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemRole {
    #[serde(rename = "enterprise_admin")]
    EnterpriseAdmin,
    #[serde(rename = "enterprise_learner")]
    EnterpriseLearner,
    #[serde(rename = "enterprise_openedx_operator")]
    EnterpriseOperator,
}

impl SystemRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EnterpriseAdmin => SYSTEM_ENTERPRISE_ADMIN_ROLE,
            Self::EnterpriseLearner => SYSTEM_ENTERPRISE_LEARNER_ROLE,
            Self::EnterpriseOperator => SYSTEM_ENTERPRISE_OPERATOR_ROLE,
        }
    }

    pub fn feature_role(&self) -> FeatureRole {
        match self {
            Self::EnterpriseAdmin | Self::EnterpriseOperator => FeatureRole::SubscriptionsAdmin,
            Self::EnterpriseLearner => FeatureRole::SubscriptionsLearner,
        }
    }

    /// Operators act across every enterprise.
    pub fn is_all_access(&self) -> bool {
        matches!(self, Self::EnterpriseOperator)
    }
}

impl std::fmt::Display for SystemRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SystemRole {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            SYSTEM_ENTERPRISE_ADMIN_ROLE => Ok(Self::EnterpriseAdmin),
            SYSTEM_ENTERPRISE_LEARNER_ROLE => Ok(Self::EnterpriseLearner),
            SYSTEM_ENTERPRISE_OPERATOR_ROLE => Ok(Self::EnterpriseOperator),
            other => Err(RoleError::UnknownSystemRole(other.to_string())),
        }
    }
}

// ─── Permissions ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Manage plans and licenses of an enterprise.
    AdminAccess,
    /// Read plans and act on one's own license.
    LearnerOrAdminAccess,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AdminAccess => SUBSCRIPTIONS_ADMIN_ACCESS_PERMISSION,
            Self::LearnerOrAdminAccess => SUBSCRIPTIONS_ADMIN_LEARNER_ACCESS_PERMISSION,
        }
    }
}

// ─── Assignments ─────────────────────────────────────────────────────

/// A feature role bound to an enterprise, or to all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub role: FeatureRole,
    /// `None` grants the role for every enterprise.
    pub enterprise_customer_uuid: Option<EnterpriseCustomerId>,
}

impl RoleAssignment {
    /// Derive the feature-role assignment implied by a system role.
    ///
    /// Operators are always unscoped; the other roles need an enterprise.
    pub fn from_system_role(
        role: SystemRole,
        enterprise: Option<EnterpriseCustomerId>,
    ) -> Result<Self, RoleError> {
        let enterprise_customer_uuid = if role.is_all_access() {
            None
        } else {
            Some(enterprise.ok_or(RoleError::MissingContext(role))?)
        };
        Ok(Self {
            role: role.feature_role(),
            enterprise_customer_uuid,
        })
    }

    /// Unscoped admin assignment.
    pub fn operator() -> Self {
        Self {
            role: FeatureRole::SubscriptionsAdmin,
            enterprise_customer_uuid: None,
        }
    }

    /// The enterprise uuid this assignment applies to, or `*`.
    pub fn context(&self) -> String {
        match &self.enterprise_customer_uuid {
            Some(id) => id.to_string(),
            None => ALL_ACCESS_CONTEXT.to_string(),
        }
    }

    /// Whether this assignment grants `permission` on `enterprise`.
    pub fn grants(&self, permission: Permission, enterprise: &EnterpriseCustomerId) -> bool {
        let in_context = self
            .enterprise_customer_uuid
            .as_ref()
            .map_or(true, |scoped| scoped == enterprise);
        in_context && self.role.grants(permission)
    }

    pub fn has_admin_access(&self, enterprise: &EnterpriseCustomerId) -> bool {
        self.grants(Permission::AdminAccess, enterprise)
    }

    pub fn has_learner_or_admin_access(&self, enterprise: &EnterpriseCustomerId) -> bool {
        self.grants(Permission::LearnerOrAdminAccess, enterprise)
    }
}
