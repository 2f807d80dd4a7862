//! User profile and follow-graph endpoints, all behind the auth gate

use axum::{
    Extension, Json, Router,
    extract::{Multipart, Path, State},
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{EditProfileRequest, User, UserProfile},
    routes::internal,
    storage::MediaStore,
    validation,
};
use crate::state::AppState;

/// Routes mounted under `/user`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/get-details", get(get_details))
        .route("/get-user-details/:id", get(get_user_details))
        .route("/follow/:id", put(follow))
        .route("/unfollow/:id", put(unfollow))
        .route("/edit-profile/:id", put(edit_profile))
        .route("/upload-profile-pic/:id", post(upload_profile_pic))
        .route("/get-user-by-name/:username", get(get_user_by_name))
}

/// Get the logged-in user's own record
pub async fn get_details(Extension(user): Extension<User>) -> ApiResult<impl IntoResponse> {
    Ok(Json(json!({
        "isSuccess": true,
        "user": user,
    })))
}

/// Get the public view of another user's profile
pub async fn get_user_details(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .user_repository
        .find_by_id(id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::NotFound("User Not Found".to_string()))?;

    Ok(Json(json!({
        "isSuccess": true,
        "user": UserProfile::from(user),
    })))
}

/// Follow a user
pub async fn follow(
    State(state): State<AppState>,
    Extension(current): Extension<User>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    if id == current.id {
        return Err(ApiError::Forbidden("Cannot Follow Yourself".to_string()));
    }

    let target = state
        .user_repository
        .find_by_id(id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::NotFound("User Not Found".to_string()))?;

    if target.followers.contains(&current.id) {
        return Err(ApiError::Conflict("Already following".to_string()));
    }

    state
        .user_repository
        .follow(target.id, current.id)
        .await
        .map_err(internal)?;

    Ok(Json(json!({ "isSuccess": true })))
}

/// Unfollow a user
pub async fn unfollow(
    State(state): State<AppState>,
    Extension(current): Extension<User>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let target = state
        .user_repository
        .find_by_id(id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::NotFound("User Not Found".to_string()))?;

    if !target.followers.contains(&current.id) {
        return Err(ApiError::Conflict("Not following".to_string()));
    }

    state
        .user_repository
        .unfollow(target.id, current.id)
        .await
        .map_err(internal)?;

    Ok(Json(json!({ "isSuccess": true })))
}

/// Edit the caller's own profile
pub async fn edit_profile(
    State(state): State<AppState>,
    Extension(current): Extension<User>,
    Path(id): Path<Uuid>,
    Json(payload): Json<EditProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    if id != current.id {
        return Err(ApiError::Forbidden(
            "Not allowed to edit other details".to_string(),
        ));
    }

    validation::validate_name(&payload.name)
        .map_err(|_| ApiError::Validation("Mandatory fields are missing!".to_string()))?;

    let updated = state
        .user_repository
        .update_profile(
            current.id,
            &payload.name,
            payload.dob,
            payload.location.as_deref(),
        )
        .await
        .map_err(internal)?;

    if updated.is_none() {
        return Err(ApiError::NotFound("User Not Found".to_string()));
    }

    Ok(Json(json!({
        "isSuccess": true,
        "msg": "User data updated successfully!",
    })))
}

/// Upload a profile picture to object storage
pub async fn upload_profile_pic(
    State(state): State<AppState>,
    Extension(current): Extension<User>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    if id != current.id {
        return Err(ApiError::Forbidden(
            "Not allowed to change other's profile".to_string(),
        ));
    }

    let mut upload: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::Validation("Invalid multipart payload".to_string()))?
    {
        if field.name() != Some("profilePic") {
            continue;
        }

        let filename = field.file_name().unwrap_or("profile-pic").to_string();
        let content_type = field.content_type().map(|s| s.to_string());

        if !state
            .upload_policy
            .validate(content_type.as_deref(), &filename)
        {
            continue;
        }

        let content_type =
            content_type.unwrap_or_else(|| "image/jpeg".to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|_| ApiError::Validation("Invalid multipart payload".to_string()))?;

        upload = Some((filename, content_type, bytes.to_vec()));
        break;
    }

    // Disallowed or missing files are rejected without storing anything
    let (filename, content_type, bytes) =
        upload.ok_or_else(|| ApiError::Validation("File type not allowed".to_string()))?;

    let key = MediaStore::avatar_key(current.id, &filename);
    let locator = state
        .media_store
        .put_image(&key, bytes, &content_type)
        .await
        .map_err(internal)?;

    state
        .user_repository
        .set_profile_pic(current.id, &locator)
        .await
        .map_err(internal)?;

    Ok(Json(json!({
        "isSuccess": true,
        "msg": "File Uploaded Successfully!",
        "profilePic": locator,
    })))
}

/// Case-insensitive username prefix search
pub async fn get_user_by_name(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<impl IntoResponse> {
    if username.is_empty() {
        return Err(ApiError::Validation("Username is required".to_string()));
    }

    let users = state
        .user_repository
        .search_by_username_prefix(&username)
        .await
        .map_err(internal)?;

    Ok(Json(json!({
        "isSuccess": true,
        "users": users,
    })))
}
