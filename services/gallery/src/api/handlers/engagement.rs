use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use tracing::info;
use uuid::Uuid;

use crate::api::auth::authenticate;
use crate::api::types::{CommentResponse, CreateCommentRequest, FavoriteRequest, FavoriteResponse};
use crate::api::validation::{check_length, ValidationError, MAX_COMMENT_CHARS};
use crate::api::ApiState;
use crate::storage::{format_timestamp, CommentRecord, FavoriteToggle};

use super::{bad_request, invalid, invalid_json, not_found, storage_error, CreatedResult};

fn required_artwork_id(artwork_id: Option<String>) -> Result<String, ValidationError> {
    artwork_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            ValidationError::with_hint(
                "artworkId is required",
                "Include the artwork to act on. Example: {\"artworkId\": \"...\"}",
            )
        })
}

pub async fn create_comment(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    payload: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> CreatedResult<CommentResponse> {
    let artist = authenticate(&state, &headers).await?;
    let Json(request) = payload.map_err(invalid_json)?;

    let artwork_id = required_artwork_id(request.artwork_id).map_err(invalid)?;
    let content = request
        .content
        .ok_or_else(|| bad_request("content is required", "Say something about the artwork"))?;
    check_length("content", Some(&content), MAX_COMMENT_CHARS).map_err(invalid)?;
    let content = content.trim().to_string();
    if content.is_empty() {
        return Err(bad_request("content cannot be empty", "Write a comment with some text"));
    }

    let artwork = state
        .with_db(move |db| db.get_artwork(&artwork_id))
        .await
        .map_err(storage_error)?
        .ok_or_else(|| not_found("Artwork not found"))?;

    let now = state.clock.now();
    let comment = CommentRecord {
        id: Uuid::new_v4().to_string(),
        artwork_id: artwork.id.clone(),
        artist_id: artist.id.clone(),
        content,
        created_at: format_timestamp(now),
    };
    let stored = comment.clone();
    let artist_id = artist.id.clone();
    state
        .with_db(move |db| {
            db.insert_comment(&stored)?;
            db.touch_artist(&artist_id, now)
        })
        .await
        .map_err(storage_error)?;

    info!(
        comment_id = %comment.id,
        artwork_id = %artwork.id,
        artist = %artist.name,
        "comment added"
    );

    Ok((
        StatusCode::CREATED,
        Json(CommentResponse {
            success: true,
            comment,
        }),
    ))
}

pub async fn toggle_favorite(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    payload: Result<Json<FavoriteRequest>, JsonRejection>,
) -> CreatedResult<FavoriteResponse> {
    let artist = authenticate(&state, &headers).await?;
    let Json(request) = payload.map_err(invalid_json)?;
    let artwork_id = required_artwork_id(request.artwork_id).map_err(invalid)?;

    let artwork = state
        .with_db(move |db| db.get_artwork(&artwork_id))
        .await
        .map_err(storage_error)?
        .ok_or_else(|| not_found("Artwork not found"))?;

    let now = state.clock.now();
    let favorite_id = Uuid::new_v4().to_string();
    let target = artwork.id.clone();
    let artist_id = artist.id.clone();
    let toggle = state
        .with_db(move |db| {
            let toggle = db.toggle_favorite(&favorite_id, &target, &artist_id, now)?;
            db.touch_artist(&artist_id, now)?;
            Ok(toggle)
        })
        .await
        .map_err(storage_error)?;

    info!(artwork_id = %artwork.id, artist = %artist.name, ?toggle, "favorite toggled");

    let response = match toggle {
        FavoriteToggle::Added => (
            StatusCode::CREATED,
            FavoriteResponse {
                success: true,
                favorited: true,
                message: format!("Added \"{}\" to favorites", artwork.title),
            },
        ),
        FavoriteToggle::Removed => (
            StatusCode::OK,
            FavoriteResponse {
                success: true,
                favorited: false,
                message: format!("Removed \"{}\" from favorites", artwork.title),
            },
        ),
    };
    Ok((response.0, Json(response.1)))
}
