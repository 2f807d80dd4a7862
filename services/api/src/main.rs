use anyhow::Result;
use aws_config::BehaviorVersion;
use tracing::info;
use tracing_subscriber::EnvFilter;

use api::{
    jwt::{JwtConfig, JwtService},
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::{UserRepository, tweets::TweetRepository},
    routes,
    state::{AppState, FeedConfig},
    storage::{MediaStore, StorageConfig, UploadPolicy},
};
use common::database::{DatabaseConfig, health_check, init_pool};
use common::error::StoreError;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting chirp API service");

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    // Apply pending migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| StoreError::Migration(e.to_string()))?;

    // Initialize the JWT service
    let jwt_config = JwtConfig::from_env()?;
    let jwt_service = JwtService::new(jwt_config);

    // Initialize object storage
    let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let s3_client = aws_sdk_s3::Client::new(&aws_config);
    let media_store = MediaStore::new(s3_client, StorageConfig::from_env());

    let user_repository = UserRepository::new(pool.clone());
    let tweet_repository = TweetRepository::new(pool.clone());
    let rate_limiter = RateLimiter::new(RateLimiterConfig::from_env());

    let app_state = AppState {
        db_pool: pool,
        user_repository,
        tweet_repository,
        jwt_service,
        media_store,
        upload_policy: UploadPolicy::from_env(),
        rate_limiter,
        feed: FeedConfig::from_env(),
    };

    info!("chirp API service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    info!("chirp API service listening on 0.0.0.0:{}", port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
