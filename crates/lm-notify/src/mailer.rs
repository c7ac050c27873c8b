//! # Mailer
//!
//! The hand-off point for composed notifications. Rendering and delivery
//! belong to whatever sits behind a [`Mailer`]; the implementations here
//! either keep notifications in memory ([`Outbox`]) or log them
//! ([`TracingMailer`]).

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::NotifyError;
use crate::notification::Notification;

pub trait Mailer: Send + Sync {
    /// Accept one notification. Incomplete notifications are rejected.
    fn send(&self, notification: Notification) -> Result<(), NotifyError>;

    /// Accept notifications in order, stopping at the first error.
    fn send_all(&self, notifications: Vec<Notification>) -> Result<usize, NotifyError> {
        let mut sent = 0;
        for notification in notifications {
            self.send(notification)?;
            sent += 1;
        }
        Ok(sent)
    }
}

/// In-memory mailer. Clones share the same queue.
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything accepted so far.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    /// Remove and return everything accepted so far.
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.sent.lock())
    }

    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.lock().is_empty()
    }
}

impl Mailer for Outbox {
    fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        notification.ensure_complete()?;
        self.sent.lock().push(notification);
        Ok(())
    }
}

/// Logs each notification at INFO and drops it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMailer;

impl Mailer for TracingMailer {
    fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        notification.ensure_complete()?;
        tracing::info!(
            kind = %notification.kind,
            subject = %notification.subject,
            template = %notification.template_name,
            recipients = notification.recipients.len(),
            "notification composed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::NotificationKind;
    use lm_core::EmailAddress;

    fn complete() -> Notification {
        Notification::new(
            NotificationKind::Onboarding,
            "Welcome".into(),
            vec![EmailAddress::new("a@example.com").unwrap()],
        )
        .with("enterprise_name", "Acme")
        .with("learner_portal_link", "https://portal/acme")
        .with("help_center_url", "https://help")
    }

    #[test]
    fn outbox_clones_share_queue() {
        let outbox = Outbox::new();
        let handle = outbox.clone();
        handle.send(complete()).unwrap();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox.drain().len(), 1);
        assert!(handle.is_empty());
    }

    #[test]
    fn send_all_stops_at_first_error() {
        let outbox = Outbox::new();
        let incomplete = Notification::new(NotificationKind::Onboarding, "x".into(), vec![]);
        let err = outbox
            .send_all(vec![complete(), incomplete, complete()])
            .unwrap_err();
        assert!(matches!(err, NotifyError::NoRecipients(_)));
        assert_eq!(outbox.len(), 1);
    }

    #[test]
    fn tracing_mailer_validates() {
        assert!(TracingMailer.send(complete()).is_ok());
        let incomplete = Notification::new(
            NotificationKind::Activation,
            "x".into(),
            vec![EmailAddress::new("a@example.com").unwrap()],
        );
        assert!(TracingMailer.send(incomplete).is_err());
    }
}
