//! Authentication middleware for bearer token validation
//!
//! Verifies the `Authorization: Bearer` header, loads the referenced
//! user, and attaches the full record to the request extensions. A token
//! whose user no longer exists is treated as invalid.

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use axum_extra::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};
use tracing::error;

use crate::{error::ApiError, jwt::TokenError, state::AppState};

/// Extract and validate the bearer token, gate for every user/tweet route
pub async fn auth_middleware(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(auth) = auth.ok_or(ApiError::Unauthenticated)?;

    let claims = state.jwt_service.verify(auth.token()).map_err(|e| match e {
        TokenError::Expired => ApiError::TokenExpired,
        TokenError::Invalid => {
            error!("Failed to validate token");
            ApiError::Internal
        }
    })?;

    let user = state
        .user_repository
        .find_by_id(claims.sub)
        .await
        .map_err(|e| {
            error!("Failed to load user for token: {}", e);
            ApiError::Internal
        })?
        .ok_or(ApiError::Unauthenticated)?;

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
