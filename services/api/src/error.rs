//! Custom error types for the API service
//!
//! Every response follows the `{isSuccess, ...}` envelope; failures add
//! `errMsg` and, for field-level registration conflicts, `errorFor`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or malformed input
    #[error("{0}")]
    Validation(String),

    /// A unique field (email or username) is already taken
    #[error("{msg}")]
    FieldTaken { field: &'static str, msg: String },

    /// Duplicate or absent relationship (like, retweet, follow)
    #[error("{0}")]
    Conflict(String),

    /// Missing or invalid bearer token, or stale user
    #[error("Not logged in. Please log in again!")]
    Unauthenticated,

    /// Credentials did not match
    #[error("Invalid Credentials!")]
    InvalidCredentials,

    /// Bearer token past its expiry
    #[error("Token has expired. Please log in again!")]
    TokenExpired,

    /// Acting on another identity's resource
    #[error("{0}")]
    Forbidden(String),

    /// Referenced entity absent
    #[error("{0}")]
    NotFound(String),

    /// Too many attempts from the same client
    #[error("Too many attempts, please try again later!")]
    RateLimited,

    /// Unexpected failure; details stay server-side
    #[error("Internal Server Error")]
    Internal,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::FieldTaken { .. } => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthenticated
            | ApiError::InvalidCredentials
            | ApiError::TokenExpired => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = json!({
            "isSuccess": false,
            "errMsg": self.to_string(),
        });

        if let ApiError::FieldTaken { field, .. } = &self {
            body["errorFor"] = json!(field);
        }

        (status, Json(body)).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: ApiError) -> serde_json::Value {
        let response = err.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Validation("missing".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::FieldTaken {
                field: "emailId",
                msg: "taken".into()
            }
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Conflict("already liked".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ApiError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::TokenExpired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Forbidden("no".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("gone".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            ApiError::Internal.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_envelope_shape() {
        let body = body_json(ApiError::NotFound("Tweet Not Found".into())).await;
        assert_eq!(body["isSuccess"], false);
        assert_eq!(body["errMsg"], "Tweet Not Found");
        assert!(body.get("errorFor").is_none());
    }

    #[tokio::test]
    async fn test_field_conflict_names_the_field() {
        let body = body_json(ApiError::FieldTaken {
            field: "emailId",
            msg: "User with given email Id already exists!".into(),
        })
        .await;
        assert_eq!(body["isSuccess"], false);
        assert_eq!(body["errorFor"], "emailId");
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let body = body_json(ApiError::Internal).await;
        assert_eq!(body["errMsg"], "Internal Server Error");
    }
}
