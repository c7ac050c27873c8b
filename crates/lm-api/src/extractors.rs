//! # Custom Extractors & Validation
//!
//! Provides the [`Validate`] trait for request DTOs and helpers to extract
//! and validate JSON bodies and query strings in handlers.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::Json;

use crate::error::AppError;

/// Trait for request types that check business rules beyond what serde
/// deserialization checks.
pub trait Validate {
    /// Validate business rules. Returns an error message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
///
/// ```ignore
/// async fn handler(body: Result<Json<T>, JsonRejection>) -> Result<..., AppError> {
///     let req = extract_json(body)?;
/// }
/// ```
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and validate it using the [`Validate`] trait.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Extract a query string, mapping deserialization errors to
/// [`AppError::BadRequest`].
pub fn extract_query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    result
        .map(|Query(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::Router;
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Debug, Deserialize)]
    struct Seats {
        count: u64,
    }

    impl Validate for Seats {
        fn validate(&self) -> Result<(), String> {
            if self.count == 0 {
                return Err("count must be positive".into());
            }
            Ok(())
        }
    }

    async fn handler(body: Result<Json<Seats>, JsonRejection>) -> axum::response::Response {
        match extract_validated_json(body) {
            Ok(seats) => seats.count.to_string().into_response(),
            Err(err) => err.into_response(),
        }
    }

    async fn post_json(body: &str) -> StatusCode {
        let app = Router::new().route("/", post(handler));
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        app.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn valid_body_passes() {
        assert_eq!(post_json(r#"{"count": 3}"#).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_body_is_unprocessable() {
        assert_eq!(post_json("{").await, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn business_rule_violation_is_unprocessable() {
        assert_eq!(post_json(r#"{"count": 0}"#).await, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
