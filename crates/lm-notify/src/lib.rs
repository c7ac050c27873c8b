//! # lm-notify: Notification Composition
//!
//! Turns license-manager events into notifications ready for a renderer:
//!
//! | Kind           | Recipient        | Trigger                              |
//! |----------------|------------------|--------------------------------------|
//! | Activation     | learner          | license assigned                     |
//! | Reminder       | learner          | admin re-sends a pending activation  |
//! | Onboarding     | learner          | license activated                    |
//! | RevocationCap  | customer support | a plan used its last revocation      |
//!
//! Templates are identified by name only. This crate never renders text and
//! never delivers mail; it hands [`Notification`]s to a [`Mailer`].

pub mod compose;
pub mod error;
pub mod mailer;
pub mod notification;

pub use compose::{
    activation_emails, onboarding_email, reminder_emails, revocation_cap_email, CustomText,
};
pub use error::NotifyError;
pub use mailer::{Mailer, Outbox, TracingMailer};
pub use notification::{Notification, NotificationKind};
