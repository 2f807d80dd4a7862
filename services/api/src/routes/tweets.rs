//! Tweet, engagement, and feed endpoints, all behind the auth gate

use axum::{
    Extension, Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

use crate::state::AppState;
use crate::{
    error::{ApiError, ApiResult},
    models::User,
    models::tweet::{FeedQuery, ReplyRequest},
    routes::internal,
    storage::MediaStore,
    validation,
};

/// Routes mounted under `/tweet`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create-tweet", post(create_tweet))
        .route("/like/:id", post(like))
        .route("/dislike/:id", post(dislike))
        .route("/retweet/:id", post(retweet))
        .route("/reply/:id", post(reply))
        .route("/tweet-detail/:id", get(tweet_detail))
        .route("/get-tweets", get(get_tweets))
        .route("/user-tweets/:id", get(user_tweets))
        .route("/delete/:id", delete(delete_tweet))
}

/// Create a tweet with an optional image attachment
///
/// An image failing the allow-list is silently omitted; a storage error
/// fails the whole request with nothing persisted.
pub async fn create_tweet(
    State(state): State<AppState>,
    Extension(current): Extension<User>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut content = String::new();
    let mut image: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::Validation("Invalid multipart payload".to_string()))?
    {
        match field.name() {
            Some("content") => {
                content = field
                    .text()
                    .await
                    .map_err(|_| ApiError::Validation("Invalid multipart payload".to_string()))?;
            }
            Some("image") => {
                let filename = field.file_name().unwrap_or("image").to_string();
                let content_type = field.content_type().map(|s| s.to_string());

                if !state
                    .upload_policy
                    .validate(content_type.as_deref(), &filename)
                {
                    continue;
                }

                let content_type = content_type.unwrap_or_else(|| "image/jpeg".to_string());
                let bytes = field.bytes().await.map_err(|_| {
                    ApiError::Validation("Invalid multipart payload".to_string())
                })?;

                image = Some((filename, content_type, bytes.to_vec()));
            }
            _ => {}
        }
    }

    validation::validate_content(&content)
        .map_err(|_| ApiError::Validation("Content is required".to_string()))?;

    let locator = match image {
        Some((filename, content_type, bytes)) => {
            let key = MediaStore::post_key(current.id, &filename);
            let url = state
                .media_store
                .put_image(&key, bytes, &content_type)
                .await
                .map_err(internal)?;
            Some(url)
        }
        None => None,
    };

    let tweet = state
        .tweet_repository
        .create(current.id, &content, locator.as_deref())
        .await
        .map_err(internal)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "isSuccess": true,
            "msg": "Tweet created successfully",
            "tweet": tweet,
        })),
    ))
}

/// Like a tweet
pub async fn like(
    State(state): State<AppState>,
    Extension(current): Extension<User>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let tweet = state
        .tweet_repository
        .find_by_id(id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::NotFound("Tweet Not Found".to_string()))?;

    if tweet.likes.contains(&current.id) {
        return Err(ApiError::Conflict("Already liked".to_string()));
    }

    // The guarded update catches a like that landed since the check
    let added = state
        .tweet_repository
        .add_like(id, current.id)
        .await
        .map_err(internal)?;
    if !added {
        return Err(ApiError::Conflict("Already liked".to_string()));
    }

    Ok(Json(json!({
        "isSuccess": true,
        "msg": "Tweet Liked",
    })))
}

/// Remove a like from a tweet
pub async fn dislike(
    State(state): State<AppState>,
    Extension(current): Extension<User>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let tweet = state
        .tweet_repository
        .find_by_id(id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::NotFound("Tweet Not Found".to_string()))?;

    if !tweet.likes.contains(&current.id) {
        return Err(ApiError::Conflict("Tweet not liked".to_string()));
    }

    let removed = state
        .tweet_repository
        .remove_like(id, current.id)
        .await
        .map_err(internal)?;
    if !removed {
        return Err(ApiError::Conflict("Tweet not liked".to_string()));
    }

    Ok(Json(json!({ "isSuccess": true })))
}

/// Retweet a tweet
pub async fn retweet(
    State(state): State<AppState>,
    Extension(current): Extension<User>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let tweet = state
        .tweet_repository
        .find_by_id(id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::NotFound("Tweet Not Found".to_string()))?;

    if tweet.retweet_by.contains(&current.id) {
        return Err(ApiError::Conflict("Already retweeted".to_string()));
    }

    let added = state
        .tweet_repository
        .add_retweet(id, current.id)
        .await
        .map_err(internal)?;
    if !added {
        return Err(ApiError::Conflict("Already retweeted".to_string()));
    }

    Ok(Json(json!({
        "isSuccess": true,
        "msg": "Retweeted",
    })))
}

/// Reply to a tweet; the reply is itself a full tweet
pub async fn reply(
    State(state): State<AppState>,
    Extension(current): Extension<User>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReplyRequest>,
) -> ApiResult<impl IntoResponse> {
    state
        .tweet_repository
        .find_by_id(id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::NotFound("Tweet Not Found".to_string()))?;

    validation::validate_content(&payload.content)
        .map_err(|_| ApiError::Validation("Mandatory fields are missing".to_string()))?;

    let reply = state
        .tweet_repository
        .reply(id, current.id, &payload.content)
        .await
        .map_err(internal)?;

    Ok(Json(json!({
        "isSuccess": true,
        "tweet": reply,
    })))
}

/// Get a single tweet with everything expanded one level
pub async fn tweet_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let tweet = state
        .tweet_repository
        .find_by_id(id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::NotFound("Tweet Not Found".to_string()))?;

    let mut views = state
        .tweet_repository
        .expand(vec![tweet])
        .await
        .map_err(internal)?;

    Ok(Json(json!({
        "isSuccess": true,
        "tweet": views.remove(0),
    })))
}

/// Paginated feed in creation order
pub async fn get_tweets(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> ApiResult<impl IntoResponse> {
    if state.feed.response_delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(state.feed.response_delay_ms)).await;
    }

    let page = query.page.unwrap_or(1);
    let tweets = state
        .tweet_repository
        .list_page(page, state.feed.page_size)
        .await
        .map_err(internal)?;

    let views = state
        .tweet_repository
        .expand(tweets)
        .await
        .map_err(internal)?;

    Ok(Json(json!({
        "isSuccess": true,
        "tweets": views,
    })))
}

/// All tweets by one author
pub async fn user_tweets(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let tweets = state
        .tweet_repository
        .list_by_author(id)
        .await
        .map_err(internal)?;

    let views = state
        .tweet_repository
        .expand(tweets)
        .await
        .map_err(internal)?;

    Ok(Json(json!({
        "isSuccess": true,
        "tweets": views,
    })))
}

/// Delete a tweet; only its author may do this
pub async fn delete_tweet(
    State(state): State<AppState>,
    Extension(current): Extension<User>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let tweet = state
        .tweet_repository
        .find_by_id(id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::NotFound("Tweet Not Found".to_string()))?;

    if tweet.tweeted_by != current.id {
        return Err(ApiError::Forbidden(
            "Not allowed to delete other's tweet".to_string(),
        ));
    }

    state
        .tweet_repository
        .delete(id)
        .await
        .map_err(internal)?;

    Ok(Json(json!({
        "isSuccess": true,
        "msg": "Tweet Removed",
    })))
}
