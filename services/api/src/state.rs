//! Application state shared across handlers

use sqlx::PgPool;
use std::env;

use crate::{
    jwt::JwtService,
    rate_limiter::RateLimiter,
    repositories::{UserRepository, tweets::TweetRepository},
    storage::{MediaStore, UploadPolicy},
};

/// Feed pagination and throttling configuration
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Tweets per feed page
    pub page_size: i64,
    /// Artificial delay before answering feed requests, disabled by default
    pub response_delay_ms: u64,
}

impl FeedConfig {
    /// Create a new FeedConfig from environment variables
    ///
    /// # Environment Variables
    /// - `FEED_PAGE_SIZE` (default: 10)
    /// - `FEED_RESPONSE_DELAY_MS` (default: 0)
    pub fn from_env() -> Self {
        let page_size = env::var("FEED_PAGE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        let response_delay_ms = env::var("FEED_RESPONSE_DELAY_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        Self {
            page_size,
            response_delay_ms,
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub user_repository: UserRepository,
    pub tweet_repository: TweetRepository,
    pub jwt_service: JwtService,
    pub media_store: MediaStore,
    pub upload_policy: UploadPolicy,
    pub rate_limiter: RateLimiter,
    pub feed: FeedConfig,
}
