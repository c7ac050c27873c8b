//! Errors raised while composing or handing off notifications.

use thiserror::Error;

use lm_core::LicenseId;

use crate::notification::NotificationKind;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The context lacks variables the template requires.
    #[error("{kind} notification is missing variables: {}", missing.join(", "))]
    MissingVariables {
        kind: NotificationKind,
        missing: Vec<&'static str>,
    },

    #[error("{0} notification has no recipients")]
    NoRecipients(NotificationKind),

    /// Only assigned licenses can be notified.
    #[error("license {0} is not assigned to a learner")]
    LicenseNotAssigned(LicenseId),

    #[error("license {0} has no activation key")]
    MissingActivationKey(LicenseId),

    /// The mailer could not accept the notification.
    #[error("mailer rejected notification: {0}")]
    Delivery(String),
}
