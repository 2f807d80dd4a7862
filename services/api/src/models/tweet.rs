//! Tweet models and expanded views

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::UserSummary;

/// Tweet entity as stored
#[derive(Debug, Clone, Serialize)]
pub struct Tweet {
    pub id: Uuid,
    pub content: String,
    pub image: Option<String>,
    #[serde(rename = "tweetedBy")]
    pub tweeted_by: Uuid,
    pub likes: Vec<Uuid>,
    #[serde(rename = "retweetBy")]
    pub retweet_by: Vec<Uuid>,
    pub replies: Vec<Uuid>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Tweet with author, likers, retweeters, and replies expanded one level
#[derive(Debug, Clone, Serialize)]
pub struct TweetView {
    pub id: Uuid,
    pub content: String,
    pub image: Option<String>,
    #[serde(rename = "tweetedBy")]
    pub tweeted_by: Option<UserSummary>,
    pub likes: Vec<UserSummary>,
    #[serde(rename = "retweetBy")]
    pub retweet_by: Vec<UserSummary>,
    pub replies: Vec<ReplyView>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Reply embedded in an expanded tweet, with its author expanded
#[derive(Debug, Clone, Serialize)]
pub struct ReplyView {
    pub id: Uuid,
    pub content: String,
    pub image: Option<String>,
    #[serde(rename = "tweetedBy")]
    pub tweeted_by: Option<UserSummary>,
    pub likes: Vec<Uuid>,
    #[serde(rename = "retweetBy")]
    pub retweet_by: Vec<Uuid>,
    pub replies: Vec<Uuid>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Request body for replying to a tweet
#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    #[serde(default)]
    pub content: String,
}

/// Query parameters for the paginated feed
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub page: Option<u32>,
}
