//! JWT service for bearer token issuance and verification
//!
//! Tokens are signed with HS256 using a process-wide secret. There is no
//! revocation list: a token stays valid until its natural expiry,
//! regardless of logout or password change.

use anyhow::Result;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared secret for signing and verifying tokens
    pub secret: String,
    /// Login token expiration time in seconds (default: 1 hour)
    pub login_token_expiry: u64,
    /// Session ("active ping") token expiration in seconds (default: 48 hours)
    pub session_token_expiry: u64,
    /// Hand out the long-lived session token at login instead of the short one
    pub long_sessions: bool,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: shared signing secret
    /// - `JWT_LOGIN_TOKEN_EXPIRY`: login token expiry in seconds (default: 3600)
    /// - `JWT_SESSION_TOKEN_EXPIRY`: session token expiry in seconds (default: 172800)
    /// - `JWT_LONG_SESSIONS`: set to `true` to issue session tokens at login
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable not set"))?;

        let login_token_expiry = std::env::var("JWT_LOGIN_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .unwrap_or(3600);

        let session_token_expiry = std::env::var("JWT_SESSION_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "172800".to_string())
            .parse()
            .unwrap_or(172800);

        let long_sessions = std::env::var("JWT_LONG_SESSIONS")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(JwtConfig {
            secret,
            login_token_expiry,
            session_token_expiry,
            long_sessions,
        })
    }
}

/// JWT claims structure
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
}

/// Verification failure, distinguishing expiry from everything else
#[derive(Error, Debug, PartialEq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.validate_exp = true;
        // Exact expiry, no leeway window
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        JwtService {
            encoding_key,
            decoding_key,
            validation,
            config,
        }
    }

    /// Issue a token for a user with the given time-to-live
    pub fn issue(&self, user_id: Uuid, ttl_seconds: u64) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| anyhow::anyhow!("Failed to get current time: {}", e))?
            .as_secs();

        let claims = Claims {
            sub: user_id,
            iat: now,
            exp: now + ttl_seconds,
        };

        let token = encode(
            &Header::new(jsonwebtoken::Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?;
        Ok(token)
    }

    /// Issue the short-lived token handed out at login
    pub fn login_token(&self, user_id: Uuid) -> Result<String> {
        self.issue(user_id, self.config.login_token_expiry)
    }

    /// Issue the long-lived session token
    pub fn session_token(&self, user_id: Uuid) -> Result<String> {
        self.issue(user_id, self.config.session_token_expiry)
    }

    /// Issue the token handed out at login together with its time-to-live
    ///
    /// Deployments running with `JWT_LONG_SESSIONS` get the session token
    /// here instead of the short-lived default.
    pub fn issue_for_login(&self, user_id: Uuid) -> Result<(String, u64)> {
        if self.config.long_sessions {
            let token = self.session_token(user_id)?;
            Ok((token, self.config.session_token_expiry))
        } else {
            let token = self.login_token(user_id)?;
            Ok((token, self.config.login_token_expiry))
        }
    }

    /// Verify a token and return the claims
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }

}
