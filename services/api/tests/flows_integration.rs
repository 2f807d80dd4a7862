//! Integration tests for the core user and tweet flows
//!
//! These exercise the repositories against a real PostgreSQL database
//! (with migrations applied) and are ignored by default.

use api::jwt::{JwtConfig, JwtService};
use api::models::NewUser;
use api::rate_limiter::{RateLimiter, RateLimiterConfig};
use api::repositories::{UserRepository, tweets::TweetRepository};
use api::routes;
use api::state::{AppState, FeedConfig};
use api::storage::{MediaStore, StorageConfig, UploadPolicy};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::database::{DatabaseConfig, init_pool};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

async fn test_pool() -> PgPool {
    let config = DatabaseConfig::from_env().expect("DATABASE_URL must be set");
    let pool = init_pool(&config).await.expect("failed to connect");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to migrate");
    pool
}

/// Full router over the given pool, with a JWT service for minting
/// request tokens. The S3 client points nowhere; none of these flows
/// may reach object storage.
fn test_app(pool: PgPool) -> (Router, JwtService) {
    let jwt_service = JwtService::new(JwtConfig {
        secret: "integration-test-secret".to_string(),
        login_token_expiry: 3600,
        session_token_expiry: 172800,
        long_sessions: false,
    });

    let s3_config = aws_sdk_s3::Config::builder()
        .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
        .region(aws_sdk_s3::config::Region::new("us-east-1"))
        .build();
    let storage_config = StorageConfig {
        bucket: "test-bucket".to_string(),
        public_base_url: "https://test-bucket.example.com".to_string(),
    };

    let state = AppState {
        db_pool: pool.clone(),
        user_repository: UserRepository::new(pool.clone()),
        tweet_repository: TweetRepository::new(pool),
        jwt_service: jwt_service.clone(),
        media_store: MediaStore::new(aws_sdk_s3::Client::from_conf(s3_config), storage_config),
        upload_policy: UploadPolicy::default(),
        rate_limiter: RateLimiter::new(RateLimiterConfig::default()),
        feed: FeedConfig {
            page_size: 10,
            response_delay_ms: 0,
        },
    };

    (routes::create_router(state), jwt_service)
}

fn unique_user(tag: &str) -> NewUser {
    let suffix = Uuid::new_v4().simple().to_string();
    NewUser {
        name: format!("Test {tag}"),
        username: format!("{tag}_{suffix}"),
        email: format!("{tag}_{suffix}@example.com"),
        password: "hunter2".to_string(),
    }
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_register_and_login_flow() {
    let pool = test_pool().await;
    let users = UserRepository::new(pool);

    let new_user = unique_user("reg");
    let created = users.create(&new_user).await.unwrap();
    assert_eq!(created.username, new_user.username);
    assert_ne!(created.password_hash, new_user.password);

    // Lookup works by username and by email alike
    let by_username = users
        .find_by_username_or_email(&new_user.username)
        .await
        .unwrap()
        .unwrap();
    let by_email = users
        .find_by_username_or_email(&new_user.email)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_username.id, by_email.id);

    assert!(users.verify_password(&created, "hunter2").unwrap());
    assert!(!users.verify_password(&created, "wrong").unwrap());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_duplicate_email_is_rejected_by_the_store() {
    let pool = test_pool().await;
    let users = UserRepository::new(pool);

    let first = unique_user("dup");
    users.create(&first).await.unwrap();

    let mut second = unique_user("dup");
    second.email = first.email.clone();

    let err = users.create(&second).await.unwrap_err();
    let db_err = err
        .downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .expect("expected a database error");
    assert!(db_err.is_unique_violation());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_follow_is_symmetric_and_reversible() {
    let pool = test_pool().await;
    let users = UserRepository::new(pool);

    let a = users.create(&unique_user("follower")).await.unwrap();
    let b = users.create(&unique_user("followee")).await.unwrap();

    users.follow(b.id, a.id).await.unwrap();

    let a_after = users.find_by_id(a.id).await.unwrap().unwrap();
    let b_after = users.find_by_id(b.id).await.unwrap().unwrap();
    assert!(a_after.followings.contains(&b.id));
    assert!(b_after.followers.contains(&a.id));

    // A duplicate follow is a guarded no-op, not a double entry
    users.follow(b.id, a.id).await.unwrap();
    let b_again = users.find_by_id(b.id).await.unwrap().unwrap();
    assert_eq!(
        b_again.followers.iter().filter(|id| **id == a.id).count(),
        1
    );

    users.unfollow(b.id, a.id).await.unwrap();
    let a_final = users.find_by_id(a.id).await.unwrap().unwrap();
    let b_final = users.find_by_id(b.id).await.unwrap().unwrap();
    assert!(!a_final.followings.contains(&b.id));
    assert!(!b_final.followers.contains(&a.id));
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_like_unlike_round_trip() {
    let pool = test_pool().await;
    let users = UserRepository::new(pool.clone());
    let tweets = TweetRepository::new(pool);

    let author = users.create(&unique_user("author")).await.unwrap();
    let liker = users.create(&unique_user("liker")).await.unwrap();
    let tweet = tweets.create(author.id, "hello world", None).await.unwrap();

    assert!(tweets.add_like(tweet.id, liker.id).await.unwrap());
    assert!(!tweets.add_like(tweet.id, liker.id).await.unwrap());

    let liked = tweets.find_by_id(tweet.id).await.unwrap().unwrap();
    assert_eq!(liked.likes, vec![liker.id]);

    assert!(tweets.remove_like(tweet.id, liker.id).await.unwrap());
    assert!(!tweets.remove_like(tweet.id, liker.id).await.unwrap());

    let unliked = tweets.find_by_id(tweet.id).await.unwrap().unwrap();
    assert!(unliked.likes.is_empty());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_deleting_a_parent_orphans_its_replies() {
    let pool = test_pool().await;
    let users = UserRepository::new(pool.clone());
    let tweets = TweetRepository::new(pool);

    let author = users.create(&unique_user("threader")).await.unwrap();
    let parent = tweets.create(author.id, "parent", None).await.unwrap();
    let reply = tweets.reply(parent.id, author.id, "child").await.unwrap();

    let linked = tweets.find_by_id(parent.id).await.unwrap().unwrap();
    assert_eq!(linked.replies, vec![reply.id]);

    assert!(tweets.delete(parent.id).await.unwrap());
    assert!(tweets.find_by_id(parent.id).await.unwrap().is_none());

    // The reply survives its parent
    let orphan = tweets.find_by_id(reply.id).await.unwrap().unwrap();
    assert_eq!(orphan.content, "child");
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_following_yourself_is_forbidden() {
    let pool = test_pool().await;
    let users = UserRepository::new(pool.clone());
    let me = users.create(&unique_user("selffollow")).await.unwrap();

    let (app, jwt) = test_app(pool);
    let token = jwt.login_token(me.id).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/user/follow/{}", me.id))
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let unchanged = users.find_by_id(me.id).await.unwrap().unwrap();
    assert!(unchanged.followers.is_empty());
    assert!(unchanged.followings.is_empty());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_deleting_anothers_tweet_is_forbidden() {
    let pool = test_pool().await;
    let users = UserRepository::new(pool.clone());
    let tweets = TweetRepository::new(pool.clone());

    let author = users.create(&unique_user("victim")).await.unwrap();
    let intruder = users.create(&unique_user("intruder")).await.unwrap();
    let tweet = tweets.create(author.id, "keep out", None).await.unwrap();

    let (app, jwt) = test_app(pool);
    let token = jwt.login_token(intruder.id).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/tweet/delete/{}", tweet.id))
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(tweets.find_by_id(tweet.id).await.unwrap().is_some());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_editing_anothers_profile_is_forbidden() {
    let pool = test_pool().await;
    let users = UserRepository::new(pool.clone());

    let victim = users.create(&unique_user("editee")).await.unwrap();
    let intruder = users.create(&unique_user("editor")).await.unwrap();

    let (app, jwt) = test_app(pool);
    let token = jwt.login_token(intruder.id).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/user/edit-profile/{}", victim.id))
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"name":"Hijacked"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let unchanged = users.find_by_id(victim.id).await.unwrap().unwrap();
    assert_eq!(unchanged.name, victim.name);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_uploading_anothers_profile_pic_is_forbidden() {
    let pool = test_pool().await;
    let users = UserRepository::new(pool.clone());

    let victim = users.create(&unique_user("pictured")).await.unwrap();
    let intruder = users.create(&unique_user("painter")).await.unwrap();

    let (app, jwt) = test_app(pool);
    let token = jwt.login_token(intruder.id).unwrap();

    let boundary = "X-CHIRP-TEST-BOUNDARY";
    let body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"profilePic\"; \
         filename=\"mine.png\"\r\nContent-Type: image/png\r\n\r\nnot-a-real-png\r\n--{boundary}--\r\n"
    );

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/user/upload-profile-pic/{}", victim.id))
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let unchanged = users.find_by_id(victim.id).await.unwrap().unwrap();
    assert_eq!(unchanged.profile_pic, victim.profile_pic);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_feed_expansion_includes_authors() {
    let pool = test_pool().await;
    let users = UserRepository::new(pool.clone());
    let tweets = TweetRepository::new(pool);

    let author = users.create(&unique_user("feed")).await.unwrap();
    let tweet = tweets.create(author.id, "expand me", None).await.unwrap();

    let views = tweets.expand(vec![tweet]).await.unwrap();
    let view = &views[0];
    let expanded_author = view.tweeted_by.as_ref().unwrap();
    assert_eq!(expanded_author.id, author.id);
    assert_eq!(expanded_author.username, author.username);
}
