//! # License Lifecycle State Machine
//!
//! Models a single seat of a subscription plan, from creation through
//! assignment, activation, and revocation.
//!
//! ## States
//!
//! ```text
//! Unassigned ──assign──▶ Assigned ──activate──▶ Activated
//!      ▲                    │                       │
//!      │                    └────────revoke─────────┴──▶ Revoked
//!      │                                                    │
//!      └──────────────────reset_to_unassigned───────────────┘
//! ```
//!
//! `reset_to_unassigned` is valid from any state and wipes the learner
//! binding. Every mutation appends a [`LicenseTransitionRecord`], which is
//! the license's history; [`License::clear_historical_pii`] scrubs learner
//! data from it during user retirement.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lm_core::constants::{ACTIVATED, ASSIGNED, DEACTIVATED, REVOKED, UNASSIGNED};
use lm_core::{
    license_activation_link, ActivationKey, EmailAddress, EnterpriseSlug, LicenseId, PlanTitle,
    PortalConfig, SubscriptionPlanId, Timestamp,
};

// ─── License Status ──────────────────────────────────────────────────

/// The lifecycle state of a license.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseStatus {
    /// Created but not bound to a learner.
    Unassigned,
    /// Bound to a learner email; waiting for the learner to activate.
    Assigned,
    /// Activated by the learner.
    Activated,
    /// No longer usable. May still carry the learner binding until retired.
    #[serde(alias = "deactivated")]
    Revoked,
}

impl LicenseStatus {
    /// All statuses in display order.
    pub const ALL: [LicenseStatus; 4] = [
        Self::Activated,
        Self::Assigned,
        Self::Unassigned,
        Self::Revoked,
    ];

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unassigned => UNASSIGNED,
            Self::Assigned => ASSIGNED,
            Self::Activated => ACTIVATED,
            Self::Revoked => REVOKED,
        }
    }

    /// Whether a learner holds this license (assigned or activated).
    pub fn is_allocated(&self) -> bool {
        matches!(self, Self::Assigned | Self::Activated)
    }
}

impl std::fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LicenseStatus {
    type Err = LicenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            UNASSIGNED => Ok(Self::Unassigned),
            ASSIGNED => Ok(Self::Assigned),
            ACTIVATED => Ok(Self::Activated),
            REVOKED | DEACTIVATED => Ok(Self::Revoked),
            other => Err(LicenseError::UnknownStatus(other.to_string())),
        }
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors that can occur during license lifecycle transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LicenseError {
    /// Attempted transition is not valid from the current state.
    #[error("invalid license transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state.
        from: LicenseStatus,
        /// Attempted target state.
        to: LicenseStatus,
    },

    /// Reminders only apply to assigned licenses.
    #[error("cannot remind a license in status {0}")]
    NotRemindable(LicenseStatus),

    /// The license is already activated by a different learner.
    #[error("license {license} is already activated by another learner")]
    ActivatedByOtherLearner {
        /// The license in question.
        license: LicenseId,
    },

    /// Status string did not name a known status.
    #[error("unknown license status: {0:?}")]
    UnknownStatus(String),
}

// ─── History ─────────────────────────────────────────────────────────

/// Record of a license mutation, with a snapshot of the learner binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseTransitionRecord {
    /// State before the change.
    pub from_state: LicenseStatus,
    /// State after the change.
    pub to_state: LicenseStatus,
    /// When the change occurred.
    pub timestamp: Timestamp,
    /// What caused the change.
    pub reason: String,
    /// Learner email after the change.
    pub user_email: Option<EmailAddress>,
    /// Learner LMS id after the change.
    pub lms_user_id: Option<u64>,
}

// ─── License ─────────────────────────────────────────────────────────

/// A single seat of a subscription plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub uuid: LicenseId,
    pub subscription_plan: SubscriptionPlanId,
    /// Title of the owning plan, kept for display.
    pub subscription_plan_title: PlanTitle,
    pub status: LicenseStatus,
    pub user_email: Option<EmailAddress>,
    pub lms_user_id: Option<u64>,
    pub activation_key: Option<ActivationKey>,
    pub assigned_date: Option<Timestamp>,
    pub activation_date: Option<Timestamp>,
    pub last_remind_date: Option<Timestamp>,
    pub revoked_date: Option<Timestamp>,
    pub created_at: Timestamp,
    /// Ordered log of every mutation.
    pub transitions: Vec<LicenseTransitionRecord>,
}

impl License {
    /// Create an unassigned license belonging to `plan`.
    pub fn new_unassigned(plan: SubscriptionPlanId, plan_title: PlanTitle, now: Timestamp) -> Self {
        Self {
            uuid: LicenseId::new(),
            subscription_plan: plan,
            subscription_plan_title: plan_title,
            status: LicenseStatus::Unassigned,
            user_email: None,
            lms_user_id: None,
            activation_key: None,
            assigned_date: None,
            activation_date: None,
            last_remind_date: None,
            revoked_date: None,
            created_at: now,
            transitions: Vec::new(),
        }
    }

    /// Bind the license to a learner (UNASSIGNED → ASSIGNED).
    ///
    /// Generates a fresh activation key. The activation notification goes
    /// out with the assignment, so the reminder clock starts now as well.
    pub fn assign(&mut self, email: EmailAddress, now: Timestamp) -> Result<(), LicenseError> {
        self.require_state(LicenseStatus::Unassigned, LicenseStatus::Assigned)?;
        self.user_email = Some(email);
        self.activation_key = Some(ActivationKey::new());
        self.assigned_date = Some(now);
        self.last_remind_date = Some(now);
        self.do_transition(LicenseStatus::Assigned, now, "assigned");
        Ok(())
    }

    /// Learner claims the license (ASSIGNED → ACTIVATED).
    ///
    /// Activating again for the same learner is a no-op.
    pub fn activate(&mut self, lms_user_id: u64, now: Timestamp) -> Result<(), LicenseError> {
        if self.status == LicenseStatus::Activated {
            return if self.lms_user_id == Some(lms_user_id) {
                Ok(())
            } else {
                Err(LicenseError::ActivatedByOtherLearner { license: self.uuid })
            };
        }
        self.require_state(LicenseStatus::Assigned, LicenseStatus::Activated)?;
        self.lms_user_id = Some(lms_user_id);
        self.activation_date = Some(now);
        self.do_transition(LicenseStatus::Activated, now, "activated");
        Ok(())
    }

    /// Record that a reminder was sent. Only valid while ASSIGNED.
    pub fn remind(&mut self, now: Timestamp) -> Result<(), LicenseError> {
        if self.status != LicenseStatus::Assigned {
            return Err(LicenseError::NotRemindable(self.status));
        }
        self.last_remind_date = Some(now);
        self.do_transition(LicenseStatus::Assigned, now, "reminded");
        Ok(())
    }

    /// Revoke the license (ASSIGNED or ACTIVATED → REVOKED).
    pub fn revoke(&mut self, now: Timestamp) -> Result<(), LicenseError> {
        if !self.status.is_allocated() {
            return Err(LicenseError::InvalidTransition {
                from: self.status,
                to: LicenseStatus::Revoked,
            });
        }
        self.revoked_date = Some(now);
        self.do_transition(LicenseStatus::Revoked, now, "revoked");
        Ok(())
    }

    /// Reset to UNASSIGNED and clear every field that no longer applies.
    pub fn reset_to_unassigned(&mut self, now: Timestamp) {
        self.user_email = None;
        self.lms_user_id = None;
        self.last_remind_date = None;
        self.activation_date = None;
        self.activation_key = None;
        self.assigned_date = None;
        self.revoked_date = None;
        self.do_transition(LicenseStatus::Unassigned, now, "reset to unassigned");
    }

    /// Remove learner PII (email and LMS id) without changing status.
    pub fn clear_pii(&mut self) {
        self.user_email = None;
        self.lms_user_id = None;
    }

    /// Remove learner PII from every history record.
    pub fn clear_historical_pii(&mut self) {
        for record in &mut self.transitions {
            record.user_email = None;
            record.lms_user_id = None;
        }
    }

    /// Whether a learner currently holds this license.
    pub fn is_allocated(&self) -> bool {
        self.status.is_allocated()
    }

    /// Whether this license is bound to the given email or LMS id.
    pub fn belongs_to(&self, email: Option<&EmailAddress>, lms_user_id: Option<u64>) -> bool {
        let email_match = email.is_some() && self.user_email.as_ref() == email;
        let lms_match = lms_user_id.is_some() && self.lms_user_id == lms_user_id;
        email_match || lms_match
    }

    /// The activation link for this license, once it has been assigned.
    pub fn activation_link(&self, config: &PortalConfig, slug: &EnterpriseSlug) -> Option<String> {
        self.activation_key
            .as_ref()
            .map(|key| license_activation_link(config, slug, key))
    }

    fn require_state(&self, expected: LicenseStatus, target: LicenseStatus) -> Result<(), LicenseError> {
        if self.status != expected {
            return Err(LicenseError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }
        Ok(())
    }

    fn do_transition(&mut self, to: LicenseStatus, now: Timestamp, reason: &str) {
        self.transitions.push(LicenseTransitionRecord {
            from_state: self.status,
            to_state: to,
            timestamp: now,
            reason: reason.to_string(),
            user_email: self.user_email.clone(),
            lms_user_id: self.lms_user_id,
        });
        self.status = to;
    }
}

impl std::fmt::Display for License {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<License with UUID '{}' for SubscriptionPlan '{}' with UUID '{}'>",
            self.uuid, self.subscription_plan_title, self.subscription_plan
        )
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn now() -> Timestamp {
        Timestamp::parse("2026-03-01T09:00:00Z").unwrap()
    }

    fn email(s: &str) -> EmailAddress {
        EmailAddress::new(s).unwrap()
    }

    fn make_unassigned() -> License {
        License::new_unassigned(SubscriptionPlanId::new(), PlanTitle::new("Annual").unwrap(), now())
    }

    fn make_assigned() -> License {
        let mut lic = make_unassigned();
        lic.assign(email("learner@example.com"), now()).unwrap();
        lic
    }

    fn make_activated() -> License {
        let mut lic = make_assigned();
        lic.activate(42, now()).unwrap();
        lic
    }

    // ── Happy path ───────────────────────────────────────────────────

    #[test]
    fn test_new_license_is_unassigned() {
        let lic = make_unassigned();
        assert_eq!(lic.status, LicenseStatus::Unassigned);
        assert!(lic.activation_key.is_none());
        assert!(lic.transitions.is_empty());
    }

    #[test]
    fn test_display_names_plan_title() {
        let lic = make_unassigned();
        assert_eq!(
            lic.to_string(),
            format!(
                "<License with UUID '{}' for SubscriptionPlan 'Annual' with UUID '{}'>",
                lic.uuid, lic.subscription_plan
            )
        );
    }

    #[test]
    fn test_assign_sets_binding_and_key() {
        let lic = make_assigned();
        assert_eq!(lic.status, LicenseStatus::Assigned);
        assert_eq!(lic.user_email, Some(email("learner@example.com")));
        assert!(lic.activation_key.is_some());
        assert_eq!(lic.assigned_date, Some(now()));
        assert_eq!(lic.last_remind_date, Some(now()));
        assert_eq!(lic.transitions.len(), 1);
    }

    #[test]
    fn test_activate_records_learner() {
        let lic = make_activated();
        assert_eq!(lic.status, LicenseStatus::Activated);
        assert_eq!(lic.lms_user_id, Some(42));
        assert_eq!(lic.activation_date, Some(now()));
    }

    #[test]
    fn test_activate_is_idempotent_for_same_learner() {
        let mut lic = make_activated();
        lic.activate(42, now()).unwrap();
        assert_eq!(lic.transitions.len(), 2);
    }

    #[test]
    fn test_activate_rejects_other_learner() {
        let mut lic = make_activated();
        let err = lic.activate(7, now()).unwrap_err();
        assert!(matches!(err, LicenseError::ActivatedByOtherLearner { .. }));
    }

    #[test]
    fn test_revoke_from_assigned_and_activated() {
        let mut assigned = make_assigned();
        assigned.revoke(now()).unwrap();
        assert_eq!(assigned.status, LicenseStatus::Revoked);
        assert_eq!(assigned.revoked_date, Some(now()));

        let mut activated = make_activated();
        activated.revoke(now()).unwrap();
        assert_eq!(activated.status, LicenseStatus::Revoked);
        // The learner binding survives revocation until retirement.
        assert!(activated.user_email.is_some());
    }

    #[test]
    fn test_remind_updates_date() {
        let mut lic = make_assigned();
        let later = Timestamp::parse("2026-03-08T09:00:00Z").unwrap();
        lic.remind(later).unwrap();
        assert_eq!(lic.last_remind_date, Some(later));
    }

    #[test]
    fn test_reset_to_unassigned_clears_everything() {
        let mut lic = make_activated();
        lic.revoke(now()).unwrap();
        lic.reset_to_unassigned(now());
        assert_eq!(lic.status, LicenseStatus::Unassigned);
        assert!(lic.user_email.is_none());
        assert!(lic.lms_user_id.is_none());
        assert!(lic.activation_key.is_none());
        assert!(lic.assigned_date.is_none());
        assert!(lic.activation_date.is_none());
        assert!(lic.last_remind_date.is_none());
        assert!(lic.revoked_date.is_none());
    }

    // ── Invalid transitions ──────────────────────────────────────────

    #[test]
    fn test_cannot_activate_unassigned() {
        let mut lic = make_unassigned();
        assert_eq!(
            lic.activate(1, now()).unwrap_err(),
            LicenseError::InvalidTransition {
                from: LicenseStatus::Unassigned,
                to: LicenseStatus::Activated,
            }
        );
    }

    #[test]
    fn test_cannot_assign_twice() {
        let mut lic = make_assigned();
        assert!(lic.assign(email("other@example.com"), now()).is_err());
    }

    #[test]
    fn test_cannot_revoke_unassigned_or_revoked() {
        let mut lic = make_unassigned();
        assert!(lic.revoke(now()).is_err());
        let mut revoked = make_assigned();
        revoked.revoke(now()).unwrap();
        assert!(revoked.revoke(now()).is_err());
    }

    #[test]
    fn test_cannot_remind_activated() {
        let mut lic = make_activated();
        assert_eq!(
            lic.remind(now()).unwrap_err(),
            LicenseError::NotRemindable(LicenseStatus::Activated)
        );
    }

    // ── PII ──────────────────────────────────────────────────────────

    #[test]
    fn test_clear_pii_keeps_status() {
        let mut lic = make_activated();
        lic.clear_pii();
        assert_eq!(lic.status, LicenseStatus::Activated);
        assert!(lic.user_email.is_none());
        assert!(lic.lms_user_id.is_none());
        // History still carries the snapshot until cleared separately.
        assert!(lic.transitions.iter().any(|t| t.user_email.is_some()));
    }

    #[test]
    fn test_clear_historical_pii() {
        let mut lic = make_activated();
        lic.clear_historical_pii();
        assert!(lic
            .transitions
            .iter()
            .all(|t| t.user_email.is_none() && t.lms_user_id.is_none()));
    }

    #[test]
    fn test_belongs_to() {
        let lic = make_activated();
        assert!(lic.belongs_to(Some(&email("learner@example.com")), None));
        assert!(lic.belongs_to(None, Some(42)));
        assert!(!lic.belongs_to(None, None));
        assert!(!lic.belongs_to(Some(&email("x@example.com")), Some(1)));
    }

    // ── Links ────────────────────────────────────────────────────────

    #[test]
    fn test_activation_link_requires_key() {
        let slug = EnterpriseSlug::new("acme").unwrap();
        let config = PortalConfig::default();
        assert!(make_unassigned().activation_link(&config, &slug).is_none());
        let lic = make_assigned();
        let link = lic.activation_link(&config, &slug).unwrap();
        assert!(link.ends_with("/activate"));
        assert!(link.contains(&lic.activation_key.unwrap().to_string()));
    }

    // ── Status names ─────────────────────────────────────────────────

    #[test]
    fn test_status_parsing_accepts_deprecated_name() {
        assert_eq!(LicenseStatus::from_str("deactivated").unwrap(), LicenseStatus::Revoked);
        assert_eq!(LicenseStatus::from_str("assigned").unwrap(), LicenseStatus::Assigned);
        assert!(LicenseStatus::from_str("expired").is_err());
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(serde_json::to_string(&LicenseStatus::Activated).unwrap(), "\"activated\"");
        let old: LicenseStatus = serde_json::from_str("\"deactivated\"").unwrap();
        assert_eq!(old, LicenseStatus::Revoked);
    }

    #[test]
    fn test_license_serialization_roundtrip() {
        let lic = make_activated();
        let json = serde_json::to_string(&lic).unwrap();
        let parsed: License = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, lic);
    }
}
