use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::storage::ArtistRecord;

use super::handlers::{internal_error, ApiError};
use super::types::ErrorResponse;
use super::ApiState;

pub const API_KEY_PREFIX: &str = "daa_";
pub const API_KEY_HEADER: &str = "x-api-key";

/// Hex SHA-256 digest of an API key. Only digests are stored.
pub fn hash_api_key(api_key: &str) -> String {
    hex::encode(Sha256::digest(api_key.as_bytes()))
}

/// Key from `Authorization: Bearer <key>` or `X-Api-Key: <key>`.
pub fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty());

    bearer
        .or_else(|| {
            headers
                .get(API_KEY_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(|key| key.trim().to_string())
        })
        .filter(|key| !key.is_empty())
}

pub async fn authenticate(state: &ApiState, headers: &HeaderMap) -> Result<ArtistRecord, ApiError> {
    let api_key = extract_api_key(headers).ok_or_else(|| {
        debug!("request without api key");
        unauthorized()
    })?;

    let digest = hash_api_key(&api_key);
    match state
        .with_db(move |db| db.find_artist_by_api_key_hash(&digest))
        .await
        .map_err(internal_error)?
    {
        Some(artist) => Ok(artist),
        None => {
            warn!("rejected unknown api key");
            Err(unauthorized())
        }
    }
}

fn unauthorized() -> ApiError {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            success: false,
            error: "Unauthorized - API key required".to_string(),
            code: "unauthorized".to_string(),
            hint: Some(
                "Include your API key in the Authorization header: \"Authorization: Bearer YOUR_API_KEY\""
                    .to_string(),
            ),
            details: None,
        }),
    )
}
