//! # Constants
//!
//! Status names, notification subjects and template names, role names,
//! and the numeric limits of the subscription model.

// ─── License status names ────────────────────────────────────────────

pub const ACTIVATED: &str = "activated";
pub const ASSIGNED: &str = "assigned";
pub const UNASSIGNED: &str = "unassigned";
pub const REVOKED: &str = "revoked";
/// Deprecated spelling of [`REVOKED`], still accepted on input.
pub const DEACTIVATED: &str = "deactivated";

// ─── Notification subjects ───────────────────────────────────────────

pub const LICENSE_ACTIVATION_EMAIL_SUBJECT: &str = "Start your edX Subscription";
pub const LICENSE_REMINDER_EMAIL_SUBJECT: &str = "Your edX License is pending";
pub const ONBOARDING_EMAIL_SUBJECT: &str = "Welcome to edX Subscriptions!";
/// Prefix of the revocation-cap subject; the plan title follows it.
pub const REVOCATION_CAP_NOTIFICATION_EMAIL_SUBJECT_PREFIX: &str = "REVOCATION CAP REACHED: ";

// ─── Notification template names ─────────────────────────────────────

pub const LICENSE_ACTIVATION_EMAIL_TEMPLATE: &str = "activation";
pub const LICENSE_REMINDER_EMAIL_TEMPLATE: &str = "reminder";
pub const ONBOARDING_EMAIL_TEMPLATE: &str = "onboarding";
pub const REVOCATION_CAP_NOTIFICATION_EMAIL_TEMPLATE: &str = "revocation_cap";

// ─── Role-based access control ───────────────────────────────────────

pub const SUBSCRIPTIONS_ADMIN_ROLE: &str = "enterprise_subscriptions_admin";
pub const SUBSCRIPTIONS_LEARNER_ROLE: &str = "enterprise_subscriptions_learner";

pub const SYSTEM_ENTERPRISE_ADMIN_ROLE: &str = "enterprise_admin";
pub const SYSTEM_ENTERPRISE_LEARNER_ROLE: &str = "enterprise_learner";
pub const SYSTEM_ENTERPRISE_OPERATOR_ROLE: &str = "enterprise_openedx_operator";

pub const SUBSCRIPTIONS_ADMIN_ACCESS_PERMISSION: &str = "subscriptions.has_admin_access";
pub const SUBSCRIPTIONS_ADMIN_LEARNER_ACCESS_PERMISSION: &str =
    "subscriptions.has_learner_or_admin_access";

/// Role-assignment context granting access to every enterprise.
pub const ALL_ACCESS_CONTEXT: &str = "*";

// ─── Subsidy ─────────────────────────────────────────────────────────

pub const PERCENTAGE_DISCOUNT_TYPE: &str = "percentage";
/// A license is a 100%-off subsidy.
pub const LICENSE_DISCOUNT_VALUE: u8 = 100;

// ─── Limits ──────────────────────────────────────────────────────────

/// Salesforce opportunity ids are exactly this long.
pub const SALESFORCE_ID_LENGTH: usize = 18;

/// Revoked licenses keep learner PII for this many days.
pub const DAYS_TO_RETIRE: i64 = 90;

pub const MIN_NUM_LICENSES: u64 = 0;
pub const MAX_NUM_LICENSES: u64 = 5000;

/// Default share of a plan's licenses that may be revoked after activation.
pub const DEFAULT_REVOKE_MAX_PERCENTAGE: u8 = 5;

// ─── Batch sizes ─────────────────────────────────────────────────────

pub const LICENSE_EXPIRATION_BATCH_SIZE: usize = 200;

// ─── Feature toggles ─────────────────────────────────────────────────

pub const EXPOSE_LICENSE_ACTIVATION_KEY_OVER_API: &str = "expose_license_activation_key_over_api";
