//! Tweet repository for database operations
//!
//! Like/retweet membership changes are guarded array updates, so the
//! write itself has set semantics and a lost pre-check race cannot
//! produce duplicate entries.

use anyhow::Result;
use sqlx::{PgPool, Row, postgres::PgRow};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::models::UserSummary;
use crate::models::tweet::{ReplyView, Tweet, TweetView};

const TWEET_COLUMNS: &str =
    "id, content, image, tweeted_by, likes, retweet_by, replies, created_at, updated_at";

fn tweet_from_row(row: &PgRow) -> Tweet {
    Tweet {
        id: row.get("id"),
        content: row.get("content"),
        image: row.get("image"),
        tweeted_by: row.get("tweeted_by"),
        likes: row.get("likes"),
        retweet_by: row.get("retweet_by"),
        replies: row.get("replies"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Tweet repository
#[derive(Clone)]
pub struct TweetRepository {
    pool: PgPool,
}

impl TweetRepository {
    /// Create a new tweet repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist a new tweet
    pub async fn create(
        &self,
        author_id: Uuid,
        content: &str,
        image: Option<&str>,
    ) -> Result<Tweet> {
        info!("Creating tweet for user {}", author_id);

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO tweets (content, image, tweeted_by)
            VALUES ($1, $2, $3)
            RETURNING {TWEET_COLUMNS}
            "#
        ))
        .bind(content)
        .bind(image)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(tweet_from_row(&row))
    }

    /// Find a tweet by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Tweet>> {
        let row = sqlx::query(&format!("SELECT {TWEET_COLUMNS} FROM tweets WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(tweet_from_row))
    }

    /// Add `user_id` to a tweet's likers; false when already present
    pub async fn add_like(&self, tweet_id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE tweets
            SET likes = array_append(likes, $2), updated_at = now()
            WHERE id = $1 AND NOT ($2 = ANY(likes))
            "#,
        )
        .bind(tweet_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove `user_id` from a tweet's likers; false when not present
    pub async fn remove_like(&self, tweet_id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE tweets
            SET likes = array_remove(likes, $2), updated_at = now()
            WHERE id = $1 AND $2 = ANY(likes)
            "#,
        )
        .bind(tweet_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Add `user_id` to a tweet's retweeters; false when already present
    pub async fn add_retweet(&self, tweet_id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE tweets
            SET retweet_by = array_append(retweet_by, $2), updated_at = now()
            WHERE id = $1 AND NOT ($2 = ANY(retweet_by))
            "#,
        )
        .bind(tweet_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Create a reply tweet and link it from its parent
    ///
    /// The reply insert and the parent's replies append happen in one
    /// transaction; the link is permanent (deleting the parent later
    /// orphans the reply without removing it).
    pub async fn reply(&self, parent_id: Uuid, author_id: Uuid, content: &str) -> Result<Tweet> {
        info!("User {} replies to tweet {}", author_id, parent_id);

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO tweets (content, tweeted_by)
            VALUES ($1, $2)
            RETURNING {TWEET_COLUMNS}
            "#
        ))
        .bind(content)
        .bind(author_id)
        .fetch_one(&mut *tx)
        .await?;

        let reply = tweet_from_row(&row);

        let updated = sqlx::query(
            r#"
            UPDATE tweets
            SET replies = array_append(replies, $2), updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(parent_id)
        .bind(reply.id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            anyhow::bail!("Parent tweet {} disappeared while replying", parent_id);
        }

        tx.commit().await?;
        Ok(reply)
    }

    /// List one page of the feed in creation order
    pub async fn list_page(&self, page: u32, page_size: i64) -> Result<Vec<Tweet>> {
        let page = page.max(1);
        let offset = (page as i64 - 1) * page_size;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {TWEET_COLUMNS}
            FROM tweets
            ORDER BY created_at
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(page_size)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(tweet_from_row).collect())
    }

    /// List all tweets by one author
    pub async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Tweet>> {
        let rows = sqlx::query(&format!(
            "SELECT {TWEET_COLUMNS} FROM tweets WHERE tweeted_by = $1 ORDER BY created_at"
        ))
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(tweet_from_row).collect())
    }

    /// Delete a tweet; replies stay behind as orphans
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tweets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Expand tweets one level: authors, likers, retweeters, and replies
    /// with their authors
    pub async fn expand(&self, tweets: Vec<Tweet>) -> Result<Vec<TweetView>> {
        let reply_ids: Vec<Uuid> = tweets.iter().flat_map(|t| t.replies.clone()).collect();
        let replies = self.find_many(&reply_ids).await?;
        let replies_by_id: HashMap<Uuid, Tweet> =
            replies.into_iter().map(|t| (t.id, t)).collect();

        let mut user_ids: Vec<Uuid> = Vec::new();
        for tweet in &tweets {
            user_ids.push(tweet.tweeted_by);
            user_ids.extend(&tweet.likes);
            user_ids.extend(&tweet.retweet_by);
        }
        user_ids.extend(replies_by_id.values().map(|r| r.tweeted_by));
        let users = self.load_summaries(&user_ids).await?;

        let views = tweets
            .into_iter()
            .map(|tweet| {
                let reply_views = tweet
                    .replies
                    .iter()
                    .filter_map(|id| replies_by_id.get(id))
                    .map(|reply| ReplyView {
                        id: reply.id,
                        content: reply.content.clone(),
                        image: reply.image.clone(),
                        tweeted_by: users.get(&reply.tweeted_by).cloned(),
                        likes: reply.likes.clone(),
                        retweet_by: reply.retweet_by.clone(),
                        replies: reply.replies.clone(),
                        created_at: reply.created_at,
                    })
                    .collect();

                TweetView {
                    id: tweet.id,
                    content: tweet.content,
                    image: tweet.image,
                    tweeted_by: users.get(&tweet.tweeted_by).cloned(),
                    likes: summaries_for(&users, &tweet.likes),
                    retweet_by: summaries_for(&users, &tweet.retweet_by),
                    replies: reply_views,
                    created_at: tweet.created_at,
                }
            })
            .collect();

        Ok(views)
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Tweet>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let rows = sqlx::query(&format!(
            "SELECT {TWEET_COLUMNS} FROM tweets WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(tweet_from_row).collect())
    }

    async fn load_summaries(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, UserSummary>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query(
            "SELECT id, name, username, profile_pic FROM users WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let summary = UserSummary {
                    id: row.get("id"),
                    name: row.get("name"),
                    username: row.get("username"),
                    profile_pic: row.get("profile_pic"),
                };
                (summary.id, summary)
            })
            .collect())
    }
}

fn summaries_for(users: &HashMap<Uuid, UserSummary>, ids: &[Uuid]) -> Vec<UserSummary> {
    ids.iter().filter_map(|id| users.get(id).cloned()).collect()
}
