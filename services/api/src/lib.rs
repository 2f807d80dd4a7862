//! chirp API service
//!
//! REST backend for the chirp social network: account registration and
//! login, bearer-token authentication, profiles and the follow graph,
//! and the tweet feed with likes, retweets, replies, and image
//! attachments.

pub mod error;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod rate_limiter;
pub mod repositories;
pub mod routes;
pub mod state;
pub mod storage;
pub mod validation;
