//! # lm-api: Axum API for the License Manager
//!
//! HTTP surface over the subscription registry in `lm-state`, with
//! notification composition from `lm-notify`.
//!
//! ## API Surface
//!
//! | Prefix                      | Module                          |
//! |-----------------------------|---------------------------------|
//! | `/v1/customer-agreements/*` | [`routes::agreements`]          |
//! | `/v1/subscriptions/*`       | [`routes::subscriptions`], [`routes::licenses`] |
//! | `/v1/licenses/activate`     | [`routes::licenses`]            |
//! | `/v1/learner-licenses`      | [`routes::licenses`]            |
//! | `/v1/renewals/*`            | [`routes::renewals`]            |
//! | `/v1/retirements/*`         | [`routes::retirements`]         |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```
//!
//! Health probes, `/metrics`, and `/openapi.json` sit outside auth.

pub mod auth;
pub mod catalog;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::middleware::from_fn;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;

pub use error::AppError;
pub use state::{AppConfig, AppState};

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };

    // Authenticated API routes.
    let api = Router::new()
        .merge(routes::agreements::router())
        .merge(routes::subscriptions::router())
        .merge(routes::licenses::router())
        .merge(routes::renewals::router())
        .merge(routes::retirements::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .with_state(state.clone());

    // Unauthenticated probes and documents.
    let public = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(render_metrics))
        .merge(openapi::router())
        .with_state(state);

    Router::new().merge(public).merge(api)
}

/// Liveness probe. 200 while the process runs.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe.
async fn readiness() -> &'static str {
    "ready"
}

/// GET /metrics: Prometheus text exposition.
async fn render_metrics(State(state): State<AppState>) -> Result<String, AppError> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or_else(|| AppError::ServiceUnavailable("metrics recorder not installed".into()))
}
