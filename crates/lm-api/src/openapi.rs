//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "License Manager API",
        version = "0.1.0",
        description = "Subscription plans and license lifecycle for enterprise customers: assignment, activation, revocation, renewal, expiration, and learner retirement.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        // Agreements
        crate::routes::agreements::create_agreement,
        crate::routes::agreements::list_agreements,
        crate::routes::agreements::get_agreement,
        // Subscriptions
        crate::routes::subscriptions::create_plan,
        crate::routes::subscriptions::list_plans,
        crate::routes::subscriptions::get_plan,
        crate::routes::subscriptions::expire_plan,
        crate::routes::subscriptions::contains_content,
        // Licenses
        crate::routes::licenses::list_licenses,
        crate::routes::licenses::license_overview,
        crate::routes::licenses::increase_licenses,
        crate::routes::licenses::assign_licenses,
        crate::routes::licenses::remind,
        crate::routes::licenses::remind_all,
        crate::routes::licenses::revoke,
        crate::routes::licenses::activate,
        crate::routes::licenses::learner_licenses,
        // Renewals
        crate::routes::renewals::create_renewal,
        crate::routes::renewals::process_renewal,
        // Retirements
        crate::routes::retirements::retire_user,
        crate::routes::retirements::retire_revoked_licenses,
    ),
    components(schemas(
        // Views
        crate::routes::AgreementView,
        crate::routes::ExpirationView,
        crate::routes::PlanView,
        crate::routes::LicenseView,
        crate::routes::RenewalView,
        crate::routes::EmailText,
        // Error types
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        // Agreement DTOs
        crate::routes::agreements::CreateAgreementRequest,
        crate::routes::agreements::AgreementDetail,
        // Subscription DTOs
        crate::routes::subscriptions::CreatePlanRequest,
        crate::routes::subscriptions::ContainsContentResponse,
        crate::routes::subscriptions::ExpirationResponse,
        // License DTOs
        crate::routes::licenses::IncreaseLicensesRequest,
        crate::routes::licenses::AssignLicensesRequest,
        crate::routes::licenses::AssignResponse,
        crate::routes::licenses::RemindRequest,
        crate::routes::licenses::RemindAllRequest,
        crate::routes::licenses::RemindResponse,
        crate::routes::licenses::RevokeRequest,
        crate::routes::licenses::RevokeResponse,
        crate::routes::licenses::ActivateRequest,
        crate::routes::licenses::ActivateResponse,
        crate::routes::licenses::StatusCount,
        crate::routes::licenses::SubsidyView,
        crate::routes::licenses::LearnerLicenseView,
        // Renewal DTOs
        crate::routes::renewals::CreateRenewalRequest,
        crate::routes::renewals::ProcessRenewalResponse,
        // Retirement DTOs
        crate::routes::retirements::RetireUserRequest,
        crate::routes::retirements::RetirementResponse,
    )),
    tags(
        (name = "agreements", description = "Customer agreements"),
        (name = "subscriptions", description = "Subscription plans"),
        (name = "licenses", description = "License assignment, activation, and revocation"),
        (name = "renewals", description = "Subscription renewals"),
        (name = "retirements", description = "Learner PII retirement"),
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI JSON spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_has_title_and_version() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "License Manager API");
        assert_eq!(spec.info.version, "0.1.0");
    }

    #[test]
    fn spec_documents_license_lifecycle_paths() {
        let spec = ApiDoc::openapi();
        for path in [
            "/v1/customer-agreements",
            "/v1/subscriptions/{id}",
            "/v1/subscriptions/{id}/licenses/assign",
            "/v1/subscriptions/{id}/licenses/revoke",
            "/v1/licenses/activate",
            "/v1/renewals/{id}/process",
            "/v1/retirements",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn spec_serializes() {
        let json = serde_json::to_string(&ApiDoc::openapi()).unwrap();
        assert!(json.contains("LicenseView"));
    }
}
