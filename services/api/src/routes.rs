//! Router assembly and the public account endpoints

use axum::{
    Json, Router,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::{
    error::{ApiError, ApiResult},
    middleware::auth_middleware,
    models::{LoginRequest, NewUser, RegisterRequest},
    state::AppState,
    validation,
};

pub mod tweets;
pub mod users;

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .nest("/user", users::router())
        .nest("/tweet", tweets::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/register", post(register))
        .route("/login", post(login))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

/// Build the CORS layer from the `CORS_ALLOWED_ORIGIN` env var
fn cors_layer() -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match std::env::var("CORS_ALLOWED_ORIGIN") {
        Ok(origin) if origin != "*" => match origin.parse::<HeaderValue>() {
            Ok(value) => layer.allow_origin(value),
            Err(_) => {
                error!("Invalid CORS_ALLOWED_ORIGIN value, falling back to any origin");
                layer.allow_origin(Any)
            }
        },
        _ => layer.allow_origin(Any),
    }
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "chirp-api"
    }))
}

/// Rate-limiting key for a request: the first forwarded address when the
/// service sits behind a proxy, the peer address otherwise
fn client_key(headers: &HeaderMap, addr: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| {
            addr.map(|a| a.ip().to_string())
                .unwrap_or_else(|| "unknown".to_string())
        })
}

/// User registration endpoint
pub async fn register(
    State(state): State<AppState>,
    addr: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    if payload.name.is_empty()
        || payload.email.is_empty()
        || payload.username.is_empty()
        || payload.password.is_empty()
    {
        return Err(ApiError::Validation(
            "Mandatory fields are missing!".to_string(),
        ));
    }

    validation::validate_name(&payload.name).map_err(ApiError::Validation)?;
    validation::validate_email(&payload.email).map_err(ApiError::Validation)?;
    validation::validate_username(&payload.username).map_err(ApiError::Validation)?;
    validation::validate_password(&payload.password).map_err(ApiError::Validation)?;

    let key = client_key(&headers, addr.map(|ConnectInfo(a)| a));
    if !state.rate_limiter.check(&key).await {
        return Err(ApiError::RateLimited);
    }

    // Two sequential uniqueness probes; the unique indexes backstop the
    // race between probe and insert.
    let email_taken = state
        .user_repository
        .find_by_email(&payload.email)
        .await
        .map_err(internal)?;
    if email_taken.is_some() {
        return Err(email_conflict());
    }

    let username_taken = state
        .user_repository
        .find_by_username(&payload.username)
        .await
        .map_err(internal)?;
    if username_taken.is_some() {
        return Err(username_conflict());
    }

    let new_user = NewUser {
        name: payload.name,
        username: payload.username,
        email: payload.email,
        password: payload.password,
    };

    let user = state
        .user_repository
        .create(&new_user)
        .await
        .map_err(map_create_error)?;

    info!("Registered new user: {}", user.username);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "isSuccess": true,
            "msg": "Account created successfully!",
            "name": user.username,
        })),
    ))
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    addr: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    if payload.username_or_email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "Mandatory fields are missing!".to_string(),
        ));
    }

    let key = client_key(&headers, addr.map(|ConnectInfo(a)| a));
    if !state.rate_limiter.check(&key).await {
        return Err(ApiError::RateLimited);
    }

    let user = state
        .user_repository
        .find_by_username_or_email(&payload.username_or_email)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            ApiError::NotFound("User with given username or emailId doesn't exist".to_string())
        })?;

    let matches = state
        .user_repository
        .verify_password(&user, &payload.password)
        .map_err(internal)?;
    if !matches {
        return Err(ApiError::InvalidCredentials);
    }

    let (token, expires_in) = state.jwt_service.issue_for_login(user.id).map_err(internal)?;

    info!("User logged in: {}", user.username);

    Ok((
        StatusCode::OK,
        Json(json!({
            "isSuccess": true,
            "token": token,
            "expiresIn": expires_in,
            "user": user,
        })),
    ))
}

fn email_conflict() -> ApiError {
    ApiError::FieldTaken {
        field: "emailId",
        msg: "User with given email Id already exists!".to_string(),
    }
}

fn username_conflict() -> ApiError {
    ApiError::FieldTaken {
        field: "username",
        msg: "Username already in use, please try different username!".to_string(),
    }
}

/// Map an insert failure, turning unique-index violations into the same
/// field conflicts the probes produce
fn map_create_error(e: anyhow::Error) -> ApiError {
    if let Some(db_err) = e
        .downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
    {
        if db_err.is_unique_violation() {
            return match db_err.constraint() {
                Some("users_username_key") => username_conflict(),
                _ => email_conflict(),
            };
        }
    }

    internal(e)
}

pub(crate) fn internal(e: anyhow::Error) -> ApiError {
    error!("Unexpected failure: {}", e);
    ApiError::Internal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_key_prefers_the_forwarded_address() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        let peer: SocketAddr = "10.0.0.2:443".parse().unwrap();

        assert_eq!(client_key(&headers, Some(peer)), "203.0.113.9");
    }

    #[test]
    fn test_client_key_falls_back_to_the_peer_address() {
        let headers = HeaderMap::new();
        let peer: SocketAddr = "192.0.2.7:52100".parse().unwrap();

        assert_eq!(client_key(&headers, Some(peer)), "192.0.2.7");
        assert_eq!(client_key(&headers, None), "unknown");
    }
}
