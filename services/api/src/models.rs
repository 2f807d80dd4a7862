//! API models for users and request payloads
//!
//! Field names on the wire follow the client contract (`emailId`,
//! `profilePic`, ...), mapped to snake_case columns in the store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod tweet;

/// User entity
///
/// The password hash is never serialized to clients.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    #[serde(rename = "emailId")]
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(rename = "profilePic")]
    pub profile_pic: String,
    pub location: Option<String>,
    pub dob: Option<NaiveDate>,
    pub followers: Vec<Uuid>,
    pub followings: Vec<Uuid>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Public view of another user's profile
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub dob: Option<NaiveDate>,
    pub followers: Vec<Uuid>,
    pub followings: Vec<Uuid>,
    pub location: Option<String>,
    #[serde(rename = "profilePic")]
    pub profile_pic: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            username: user.username,
            dob: user.dob,
            followers: user.followers,
            followings: user.followings,
            location: user.location,
            profile_pic: user.profile_pic,
            created_at: user.created_at,
        }
    }
}

/// Compact user representation embedded in expanded tweets
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    #[serde(rename = "profilePic")]
    pub profile_pic: String,
}

/// New user creation payload handed to the repository
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request for user registration
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "emailId", default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Request for user login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(rename = "usernameOrEmailId", default)]
    pub username_or_email: String,
    #[serde(default)]
    pub password: String,
}

/// Request for profile edits
///
/// `name` is mandatory; absent `dob`/`location` leave the stored values
/// unchanged.
#[derive(Debug, Deserialize)]
pub struct EditProfileRequest {
    #[serde(default)]
    pub name: String,
    pub dob: Option<NaiveDate>,
    pub location: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Alice".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            profile_pic: "https://example.com/user.png".to_string(),
            location: None,
            dob: None,
            followers: vec![],
            followings: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_serialization_strips_password() {
        let user = sample_user();
        let json = serde_json::to_value(&user).unwrap();

        assert!(json.get("password_hash").is_none());
        assert!(json.get("password").is_none());
        assert_eq!(json["emailId"], "alice@example.com");
        assert_eq!(json["username"], "alice");
    }

    #[test]
    fn test_profile_view_has_no_email() {
        let user = sample_user();
        let profile = UserProfile::from(user);
        let json = serde_json::to_value(&profile).unwrap();

        assert!(json.get("emailId").is_none());
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["name"], "Alice");
        assert!(json.get("profilePic").is_some());
    }

    #[test]
    fn test_register_request_tolerates_missing_fields() {
        let req: RegisterRequest = serde_json::from_str(r#"{"name":"A"}"#).unwrap();
        assert_eq!(req.name, "A");
        assert!(req.email.is_empty());
        assert!(req.username.is_empty());
        assert!(req.password.is_empty());
    }
}
