//! # Composers
//!
//! Build complete notifications from domain state. Every composer fills
//! every variable its kind requires, so `missing_variables()` on a composed
//! notification is always empty.

use serde::{Deserialize, Serialize};

use lm_core::{learner_portal_url, EmailAddress, PortalConfig, Timestamp};
use lm_state::{CustomerAgreement, License, SubscriptionPlan};

use crate::error::NotifyError;
use crate::notification::{Notification, NotificationKind};

/// Admin-supplied text wrapped around the activation link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomText {
    #[serde(default)]
    pub greeting: String,
    #[serde(default)]
    pub closing: String,
}

/// One activation notification per license.
pub fn activation_emails(
    custom: &CustomText,
    licenses: &[&License],
    plan: &SubscriptionPlan,
    agreement: &CustomerAgreement,
    config: &PortalConfig,
) -> Result<Vec<Notification>, NotifyError> {
    licenses
        .iter()
        .map(|license| {
            license_notification(NotificationKind::Activation, custom, license, plan, agreement, config)
        })
        .collect()
}

/// One reminder per license. Same variables as activation, flagged as a
/// reminder.
pub fn reminder_emails(
    custom: &CustomText,
    licenses: &[&License],
    plan: &SubscriptionPlan,
    agreement: &CustomerAgreement,
    config: &PortalConfig,
) -> Result<Vec<Notification>, NotifyError> {
    licenses
        .iter()
        .map(|license| {
            license_notification(NotificationKind::Reminder, custom, license, plan, agreement, config)
                .map(|n| n.with("is_reminder", true))
        })
        .collect()
}

fn license_notification(
    kind: NotificationKind,
    custom: &CustomText,
    license: &License,
    plan: &SubscriptionPlan,
    agreement: &CustomerAgreement,
    config: &PortalConfig,
) -> Result<Notification, NotifyError> {
    let recipient = license
        .user_email
        .clone()
        .ok_or(NotifyError::LicenseNotAssigned(license.uuid))?;
    let link = license
        .activation_link(config, &agreement.enterprise_customer_slug)
        .ok_or(NotifyError::MissingActivationKey(license.uuid))?;
    Ok(
        Notification::new(kind, kind.subject(plan.title.as_str()), vec![recipient])
            .with("enterprise_name", agreement.enterprise_customer_name.as_str())
            .with("activation_link", link)
            .with("greeting", custom.greeting.as_str())
            .with("closing", custom.closing.as_str())
            .with("help_center_url", config.help_center_url.as_str()),
    )
}

/// Welcome message sent once a learner activates.
pub fn onboarding_email(
    recipient: EmailAddress,
    agreement: &CustomerAgreement,
    config: &PortalConfig,
) -> Notification {
    let kind = NotificationKind::Onboarding;
    Notification::new(kind, kind.subject(""), vec![recipient])
        .with("enterprise_name", agreement.enterprise_customer_name.as_str())
        .with(
            "learner_portal_link",
            learner_portal_url(config, &agreement.enterprise_customer_slug),
        )
        .with("help_center_url", config.help_center_url.as_str())
}

/// Notice to customer support that a plan has used its last revocation.
pub fn revocation_cap_email(
    plan: &SubscriptionPlan,
    agreement: &CustomerAgreement,
    config: &PortalConfig,
    now: Timestamp,
) -> Notification {
    let kind = NotificationKind::RevocationCap;
    Notification::new(
        kind,
        kind.subject(plan.title.as_str()),
        vec![config.support_email.clone()],
    )
    .with("enterprise_name", agreement.enterprise_customer_name.as_str())
    .with("subscription_title", plan.title.as_str())
    .with("num_revocations_applied", plan.num_revocations_applied)
    .with("num_revocations_allowed", plan.num_revocations_allowed())
    .with("revoke_max_percentage", plan.revoke_max_percentage)
    .with("help_center_url", config.help_center_url.as_str())
    .with("timestamp", render_timestamp(now))
}

/// e.g. `March 01, 2026 09:00AM UTC`
fn render_timestamp(now: Timestamp) -> String {
    now.as_datetime().format("%B %d, %Y %I:%M%p UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use lm_core::{
        EnterpriseCatalogId, EnterpriseCustomerId, EnterpriseSlug, PlanTitle,
        SalesforceOpportunityId,
    };
    use lm_state::PlanTerms;

    fn now() -> Timestamp {
        Timestamp::parse("2026-03-01T09:00:00Z").unwrap()
    }

    fn agreement() -> CustomerAgreement {
        CustomerAgreement::new(
            EnterpriseCustomerId::new(),
            EnterpriseSlug::new("acme").unwrap(),
            "Acme Corp",
            Some(EnterpriseCatalogId::new()),
            now(),
        )
    }

    fn plan(agreement: &CustomerAgreement) -> SubscriptionPlan {
        let terms = PlanTerms {
            title: PlanTitle::new("Annual").unwrap(),
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            expiration_date: NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
            enterprise_catalog_uuid: None,
            revoke_max_percentage: 10,
            salesforce_opportunity_id: SalesforceOpportunityId::new("0060M00000abcdeXYZ").unwrap(),
            netsuite_product_id: 1,
            for_internal_use_only: false,
            is_active: true,
            num_licenses: 10,
        };
        SubscriptionPlan::new(terms, agreement, now()).unwrap()
    }

    fn email(s: &str) -> EmailAddress {
        EmailAddress::new(s).unwrap()
    }

    fn custom() -> CustomText {
        CustomText {
            greeting: "Hello team".into(),
            closing: "Happy learning".into(),
        }
    }

    #[test]
    fn activation_emails_are_complete() {
        let a = agreement();
        let mut p = plan(&a);
        let ids = p
            .assign_licenses(&[email("a@example.com"), email("b@example.com")], now())
            .unwrap();
        let licenses: Vec<&License> = ids.iter().map(|id| p.license(id).unwrap()).collect();
        let config = PortalConfig::default();

        let notes = activation_emails(&custom(), &licenses, &p, &a, &config).unwrap();
        assert_eq!(notes.len(), 2);
        for n in &notes {
            assert!(n.missing_variables().is_empty());
            assert_eq!(n.subject, "Start your edX Subscription");
            assert_eq!(n.template_name, "activation");
            assert_eq!(n.context["enterprise_name"], "Acme Corp");
            assert_eq!(n.context["greeting"], "Hello team");
            let link = n.context["activation_link"].as_str().unwrap();
            assert!(link.starts_with("http://localhost:8734/acme/licenses/"));
        }
        assert_eq!(notes[0].recipients, vec![email("a@example.com")]);
    }

    #[test]
    fn reminder_emails_flag_reminder() {
        let a = agreement();
        let mut p = plan(&a);
        let ids = p.assign_licenses(&[email("a@example.com")], now()).unwrap();
        let licenses: Vec<&License> = ids.iter().map(|id| p.license(id).unwrap()).collect();
        let notes =
            reminder_emails(&CustomText::default(), &licenses, &p, &a, &PortalConfig::default())
                .unwrap();
        assert!(notes[0].missing_variables().is_empty());
        assert_eq!(notes[0].context["is_reminder"], true);
        assert_eq!(notes[0].subject, "Your edX License is pending");
    }

    #[test]
    fn unassigned_license_cannot_be_notified() {
        let a = agreement();
        let p = plan(&a);
        let license = p.unassigned_licenses().next().unwrap();
        let err = activation_emails(&custom(), &[license], &p, &a, &PortalConfig::default())
            .unwrap_err();
        assert_eq!(err, NotifyError::LicenseNotAssigned(license.uuid));
    }

    #[test]
    fn onboarding_links_to_portal() {
        let a = agreement();
        let n = onboarding_email(email("a@example.com"), &a, &PortalConfig::default());
        assert!(n.missing_variables().is_empty());
        assert_eq!(n.context["learner_portal_link"], "http://localhost:8734/acme");
        assert_eq!(n.subject, "Welcome to edX Subscriptions!");
    }

    #[test]
    fn revocation_cap_goes_to_support() {
        let a = agreement();
        let mut p = plan(&a);
        p.num_revocations_applied = 1;
        let config = PortalConfig::default();
        let n = revocation_cap_email(&p, &a, &config, now());
        assert!(n.missing_variables().is_empty());
        assert_eq!(n.recipients, vec![config.support_email.clone()]);
        assert_eq!(n.subject, "REVOCATION CAP REACHED: Annual");
        assert_eq!(n.context["num_revocations_applied"], 1);
        assert_eq!(n.context["num_revocations_allowed"], 1);
        assert_eq!(n.context["revoke_max_percentage"], 10);
        assert_eq!(n.context["timestamp"], "March 01, 2026 09:00AM UTC");
    }
}
