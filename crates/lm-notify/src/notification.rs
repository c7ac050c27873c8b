//! # Notifications
//!
//! A [`Notification`] is everything a renderer needs: subject, template
//! name, recipients, and the named variables the template interpolates.
//! Each [`NotificationKind`] declares the variables its template requires,
//! so an incomplete context is caught before it leaves the process.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use lm_core::constants::{
    LICENSE_ACTIVATION_EMAIL_SUBJECT, LICENSE_ACTIVATION_EMAIL_TEMPLATE,
    LICENSE_REMINDER_EMAIL_SUBJECT, LICENSE_REMINDER_EMAIL_TEMPLATE, ONBOARDING_EMAIL_SUBJECT,
    ONBOARDING_EMAIL_TEMPLATE, REVOCATION_CAP_NOTIFICATION_EMAIL_SUBJECT_PREFIX,
    REVOCATION_CAP_NOTIFICATION_EMAIL_TEMPLATE,
};
use lm_core::EmailAddress;

use crate::error::NotifyError;

const ACTIVATION_VARIABLES: &[&str] = &[
    "enterprise_name",
    "activation_link",
    "greeting",
    "closing",
    "help_center_url",
];

const REMINDER_VARIABLES: &[&str] = &[
    "enterprise_name",
    "activation_link",
    "greeting",
    "closing",
    "help_center_url",
    "is_reminder",
];

const ONBOARDING_VARIABLES: &[&str] = &["enterprise_name", "learner_portal_link", "help_center_url"];

const REVOCATION_CAP_VARIABLES: &[&str] = &[
    "enterprise_name",
    "subscription_title",
    "num_revocations_applied",
    "num_revocations_allowed",
    "revoke_max_percentage",
    "help_center_url",
    "timestamp",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Activation,
    Reminder,
    Onboarding,
    RevocationCap,
}

impl NotificationKind {
    pub fn template_name(&self) -> &'static str {
        match self {
            Self::Activation => LICENSE_ACTIVATION_EMAIL_TEMPLATE,
            Self::Reminder => LICENSE_REMINDER_EMAIL_TEMPLATE,
            Self::Onboarding => ONBOARDING_EMAIL_TEMPLATE,
            Self::RevocationCap => REVOCATION_CAP_NOTIFICATION_EMAIL_TEMPLATE,
        }
    }

    /// Variables the template interpolates.
    pub fn required_variables(&self) -> &'static [&'static str] {
        match self {
            Self::Activation => ACTIVATION_VARIABLES,
            Self::Reminder => REMINDER_VARIABLES,
            Self::Onboarding => ONBOARDING_VARIABLES,
            Self::RevocationCap => REVOCATION_CAP_VARIABLES,
        }
    }

    /// Subject line. Only the revocation-cap subject names the plan.
    pub fn subject(&self, subscription_title: &str) -> String {
        match self {
            Self::Activation => LICENSE_ACTIVATION_EMAIL_SUBJECT.to_string(),
            Self::Reminder => LICENSE_REMINDER_EMAIL_SUBJECT.to_string(),
            Self::Onboarding => ONBOARDING_EMAIL_SUBJECT.to_string(),
            Self::RevocationCap => {
                format!("{REVOCATION_CAP_NOTIFICATION_EMAIL_SUBJECT_PREFIX}{subscription_title}")
            }
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.template_name())
    }
}

/// A composed, not yet rendered, notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub subject: String,
    pub template_name: String,
    pub recipients: Vec<EmailAddress>,
    pub context: BTreeMap<String, Value>,
}

impl Notification {
    pub fn new(kind: NotificationKind, subject: String, recipients: Vec<EmailAddress>) -> Self {
        Self {
            kind,
            subject,
            template_name: kind.template_name().to_string(),
            recipients,
            context: BTreeMap::new(),
        }
    }

    /// Set a context variable.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.context.insert(name.to_string(), value.into());
        self
    }

    /// Required variables absent from the context, in declaration order.
    pub fn missing_variables(&self) -> Vec<&'static str> {
        self.kind
            .required_variables()
            .iter()
            .copied()
            .filter(|name| !self.context.contains_key(*name))
            .collect()
    }

    /// Check that the notification can be rendered and delivered.
    pub fn ensure_complete(&self) -> Result<(), NotifyError> {
        if self.recipients.is_empty() {
            return Err(NotifyError::NoRecipients(self.kind));
        }
        let missing = self.missing_variables();
        if !missing.is_empty() {
            return Err(NotifyError::MissingVariables {
                kind: self.kind,
                missing,
            });
        }
        Ok(())
    }
}
