//! User repository for database operations

use anyhow::Result;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use crate::models::{NewUser, User};

pub mod tweets;

const USER_COLUMNS: &str = "id, name, username, email, password_hash, profile_pic, location, dob, \
                            followers, followings, created_at, updated_at";

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        name: row.get("name"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        profile_pic: row.get("profile_pic"),
        location: row.get("location"),
        dob: row.get("dob"),
        followers: row.get("followers"),
        followings: row.get("followings"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user with a freshly hashed password
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        info!("Creating new user: {}", new_user.username);

        let salt = SaltString::generate(&mut rand::thread_rng());
        let argon2 = Argon2::default();
        let password_hash = argon2
            .hash_password(new_user.password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
            .to_string();

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (name, username, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new_user.name)
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(user_from_row(&row))
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Find a user by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Find a user by username
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Find a user by username or email in a single query
    pub async fn find_by_username_or_email(&self, username_or_email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = $1"
        ))
        .bind(username_or_email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Verify a user's password against the stored hash
    pub fn verify_password(&self, user: &User, password: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;

        let argon2 = Argon2::default();
        Ok(argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Case-insensitive username prefix search
    pub async fn search_by_username_prefix(&self, prefix: &str) -> Result<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username ILIKE $1 ORDER BY username"
        ))
        .bind(format!("{prefix}%"))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    /// Record that `follower_id` follows `target_id`
    ///
    /// Both sides of the relationship are written in one transaction so a
    /// mid-flight failure cannot leave the graph asymmetric. The array
    /// updates are guarded, so a concurrent duplicate request is a no-op
    /// rather than a double entry.
    pub async fn follow(&self, target_id: Uuid, follower_id: Uuid) -> Result<()> {
        info!("User {} follows {}", follower_id, target_id);

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE users
            SET followers = array_append(followers, $2), updated_at = now()
            WHERE id = $1 AND NOT ($2 = ANY(followers))
            "#,
        )
        .bind(target_id)
        .bind(follower_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE users
            SET followings = array_append(followings, $2), updated_at = now()
            WHERE id = $1 AND NOT ($2 = ANY(followings))
            "#,
        )
        .bind(follower_id)
        .bind(target_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Remove the relationship recorded by [`follow`](Self::follow)
    pub async fn unfollow(&self, target_id: Uuid, follower_id: Uuid) -> Result<()> {
        info!("User {} unfollows {}", follower_id, target_id);

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE users
            SET followers = array_remove(followers, $2), updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(target_id)
        .bind(follower_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE users
            SET followings = array_remove(followings, $2), updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(follower_id)
        .bind(target_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Update a user's profile fields
    ///
    /// Absent `dob`/`location` leave the stored values unchanged.
    pub async fn update_profile(
        &self,
        id: Uuid,
        name: &str,
        dob: Option<chrono::NaiveDate>,
        location: Option<&str>,
    ) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users
            SET name = $2,
                dob = COALESCE($3, dob),
                location = COALESCE($4, location),
                updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(dob)
        .bind(location)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Record the locator of a freshly uploaded avatar
    pub async fn set_profile_pic(&self, id: Uuid, locator: &str) -> Result<()> {
        sqlx::query("UPDATE users SET profile_pic = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(locator)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
