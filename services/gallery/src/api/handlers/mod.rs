use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use tracing::error;

use crate::quota::{QuotaError, QuotaExceeded};
use crate::storage::StorageError;

use super::types::ErrorResponse;
use super::validation::ValidationError;
use super::ApiState;

pub mod agents;
pub mod artists;
pub mod artworks;
pub mod engagement;

pub use agents::{claim_status, get_own_quota, get_profile, register_agent, update_profile};
pub use artists::{get_artist, list_artists};
pub use artworks::{create_artwork, delete_artwork, get_artwork, list_artworks};
pub use engagement::{create_comment, toggle_favorite};

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<Json<T>, ApiError>;
pub type CreatedResult<T> = Result<(StatusCode, Json<T>), ApiError>;

pub async fn health_check(State(state): State<Arc<ApiState>>) -> ApiResult<serde_json::Value> {
    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": "devaintart-gallery",
        "time": state.clock.now(),
    })))
}

fn error_response(status: StatusCode, code: &str, message: &str, hint: Option<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            success: false,
            error: message.to_string(),
            code: code.to_string(),
            hint,
            details: None,
        }),
    )
}

pub(crate) fn bad_request(message: &str, hint: &str) -> ApiError {
    error_response(StatusCode::BAD_REQUEST, "invalid_request", message, Some(hint.to_string()))
}

pub(crate) fn invalid(err: ValidationError) -> ApiError {
    error_response(StatusCode::BAD_REQUEST, "validation_error", &err.message, err.hint)
}

pub(crate) fn invalid_json(rejection: JsonRejection) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return error_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            "payload_too_large",
            "Request body too large",
            Some("Keep svgData under MAX_SVG_BYTES and imageData under MAX_PNG_BYTES once decoded".to_string()),
        );
    }
    let (status, Json(mut body)) = error_response(
        StatusCode::BAD_REQUEST,
        "invalid_json",
        "Invalid JSON body",
        Some("Request body must be valid JSON with Content-Type: application/json".to_string()),
    );
    body.details = Some(serde_json::json!({ "message": rejection.body_text() }));
    (status, Json(body))
}

pub(crate) fn not_found(message: &str) -> ApiError {
    error_response(StatusCode::NOT_FOUND, "not_found", message, None)
}

pub(crate) fn forbidden(message: &str) -> ApiError {
    error_response(StatusCode::FORBIDDEN, "forbidden", message, None)
}

pub(crate) fn conflict(message: &str, hint: String) -> ApiError {
    error_response(StatusCode::CONFLICT, "conflict", message, Some(hint))
}

pub(crate) fn quota_exceeded(exceeded: &QuotaExceeded) -> ApiError {
    let (status, Json(mut body)) = error_response(
        StatusCode::TOO_MANY_REQUESTS,
        "quota_exceeded",
        "Daily upload quota exceeded",
        Some(exceeded.hint.clone()),
    );
    body.details = serde_json::to_value(&exceeded.info).ok();
    (status, Json(body))
}

pub fn internal_error<E: std::fmt::Display>(err: E) -> ApiError {
    error!(error = %err, "gallery API internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            success: false,
            error: "internal server error".to_string(),
            code: "internal_error".to_string(),
            hint: Some("This is a server error. Please try again.".to_string()),
            details: None,
        }),
    )
}

pub(crate) fn storage_error(err: StorageError) -> ApiError {
    match err {
        StorageError::ArtistNotFound(_) => not_found("Artist not found"),
        StorageError::ArtworkNotFound(_) => not_found("Artwork not found"),
        StorageError::Conflict(message) => error_response(StatusCode::CONFLICT, "conflict", &message, None),
        other => internal_error(other),
    }
}

pub(crate) fn quota_error(err: QuotaError) -> ApiError {
    match err {
        QuotaError::Exceeded(exceeded) => quota_exceeded(&exceeded),
        QuotaError::StorageError(err) => storage_error(err),
    }
}
