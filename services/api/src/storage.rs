//! Object storage for profile pictures and tweet images
//!
//! Uploads go straight to S3; a request only completes once the
//! `put_object` call has been confirmed, and the stored locator is the
//! public URL of the object.

use anyhow::Result;
use aws_sdk_s3::{Client, primitives::ByteStream};
use std::env;
use tracing::info;
use uuid::Uuid;

/// Object storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Bucket receiving avatar and tweet images
    pub bucket: String,
    /// Base URL under which uploaded objects are publicly reachable
    pub public_base_url: String,
}

impl StorageConfig {
    /// Create a new StorageConfig from environment variables
    ///
    /// # Environment Variables
    /// - `S3_BUCKET`: target bucket (default: "chirp-media")
    /// - `S3_PUBLIC_BASE_URL`: public URL base (default: the bucket's
    ///   virtual-hosted S3 URL)
    pub fn from_env() -> Self {
        let bucket = env::var("S3_BUCKET").unwrap_or_else(|_| "chirp-media".to_string());
        let public_base_url = env::var("S3_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("https://{}.s3.amazonaws.com", bucket));

        Self {
            bucket,
            public_base_url,
        }
    }
}

/// Allow-list check applied to every uploaded file
///
/// The declared content type wins; when the client did not declare one,
/// the file extension is checked against the same list.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    allowed_types: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            allowed_types: ["image/jpeg", "image/jpg", "image/png", "image/gif"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl UploadPolicy {
    /// Create a new UploadPolicy from environment variables
    ///
    /// `UPLOAD_ALLOWED_TYPES` is a comma-separated MIME list overriding
    /// the default image allow-list.
    pub fn from_env() -> Self {
        match env::var("UPLOAD_ALLOWED_TYPES") {
            Ok(list) if !list.trim().is_empty() => Self {
                allowed_types: list
                    .split(',')
                    .map(|s| s.trim().to_ascii_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            _ => Self::default(),
        }
    }

    /// Decide whether an upload is acceptable
    pub fn validate(&self, content_type: Option<&str>, filename: &str) -> bool {
        if let Some(declared) = content_type {
            return self
                .allowed_types
                .iter()
                .any(|t| t.eq_ignore_ascii_case(declared));
        }

        let extension = filename.rsplit_once('.').map(|(_, ext)| ext);
        match extension {
            Some(ext) => {
                let as_mime = format!("image/{}", ext.to_ascii_lowercase());
                self.allowed_types.contains(&as_mime)
            }
            None => false,
        }
    }
}

/// S3-backed media store
#[derive(Clone)]
pub struct MediaStore {
    client: Client,
    config: StorageConfig,
}

impl MediaStore {
    /// Create a new media store around an S3 client
    pub fn new(client: Client, config: StorageConfig) -> Self {
        Self { client, config }
    }

    /// Object key for a user's avatar
    pub fn avatar_key(user_id: Uuid, filename: &str) -> String {
        format!("avatars/{}/{}", user_id, filename)
    }

    /// Object key for a tweet image
    pub fn post_key(user_id: Uuid, filename: &str) -> String {
        format!("posts/{}/{}", user_id, filename)
    }

    /// Upload image bytes and return the public locator
    pub async fn put_image(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        info!("Uploading object to S3: {}", key);

        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await?;

        Ok(format!("{}/{}", self.config.public_base_url, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_accepts_allowed_mime_types() {
        let policy = UploadPolicy::default();
        assert!(policy.validate(Some("image/jpeg"), "photo.jpg"));
        assert!(policy.validate(Some("image/png"), "pixel.png"));
        assert!(policy.validate(Some("image/gif"), "loop.gif"));
    }

    #[test]
    fn test_policy_rejects_disallowed_mime_types() {
        let policy = UploadPolicy::default();
        assert!(!policy.validate(Some("application/pdf"), "doc.pdf"));
        assert!(!policy.validate(Some("text/html"), "page.html"));
        assert!(!policy.validate(Some("image/svg+xml"), "vector.svg"));
    }

    #[test]
    fn test_policy_falls_back_to_extension() {
        let policy = UploadPolicy::default();
        assert!(policy.validate(None, "photo.JPEG"));
        assert!(policy.validate(None, "pic.png"));
        assert!(!policy.validate(None, "script.sh"));
        assert!(!policy.validate(None, "no_extension"));
    }

    #[test]
    fn test_key_layout() {
        let user = Uuid::nil();
        assert_eq!(
            MediaStore::avatar_key(user, "me.png"),
            format!("avatars/{}/me.png", user)
        );
        assert_eq!(
            MediaStore::post_key(user, "cat.gif"),
            format!("posts/{}/cat.gif", user)
        );
    }
}
