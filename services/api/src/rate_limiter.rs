//! In-memory rate limiter guarding the credential endpoints

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::warn;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum number of attempts allowed within one window
    pub max_attempts: u32,
    /// Length of the counting window in seconds
    pub window_seconds: u64,
    /// Ban duration in seconds once the limit is exceeded
    pub ban_duration_seconds: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_seconds: 300,
            ban_duration_seconds: 3600,
        }
    }
}

impl RateLimiterConfig {
    /// Create a new RateLimiterConfig from environment variables
    ///
    /// # Environment Variables
    /// - `RATE_LIMIT_MAX_ATTEMPTS` (default: 5)
    /// - `RATE_LIMIT_WINDOW_SECONDS` (default: 300)
    /// - `RATE_LIMIT_BAN_SECONDS` (default: 3600)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let read = |key: &str, fallback: u64| -> u64 {
            std::env::var(key)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(fallback)
        };

        Self {
            max_attempts: read("RATE_LIMIT_MAX_ATTEMPTS", defaults.max_attempts as u64) as u32,
            window_seconds: read("RATE_LIMIT_WINDOW_SECONDS", defaults.window_seconds),
            ban_duration_seconds: read("RATE_LIMIT_BAN_SECONDS", defaults.ban_duration_seconds),
        }
    }
}

#[derive(Debug)]
struct AttemptWindow {
    attempts: u32,
    window_start: Instant,
    banned_until: Option<Instant>,
}

/// Per-key sliding-window rate limiter with a temporary ban
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    entries: Arc<Mutex<HashMap<String, AttemptWindow>>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record an attempt for `key` and report whether it is allowed
    pub async fn check(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let entry = entries.entry(key.to_string()).or_insert(AttemptWindow {
            attempts: 0,
            window_start: now,
            banned_until: None,
        });

        if let Some(banned_until) = entry.banned_until {
            if now < banned_until {
                return false;
            }
            entry.attempts = 0;
            entry.window_start = now;
            entry.banned_until = None;
        }

        if now.duration_since(entry.window_start)
            >= Duration::from_secs(self.config.window_seconds)
        {
            entry.attempts = 0;
            entry.window_start = now;
        }

        entry.attempts += 1;

        if entry.attempts > self.config.max_attempts {
            entry.banned_until = Some(now + Duration::from_secs(self.config.ban_duration_seconds));
            warn!(
                "Rate limit exceeded for key {}, banned for {} seconds",
                key, self.config.ban_duration_seconds
            );
            return false;
        }

        true
    }
}
