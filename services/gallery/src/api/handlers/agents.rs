use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use rand::Rng;
use tracing::info;
use uuid::Uuid;

use crate::api::auth::{authenticate, hash_api_key, API_KEY_PREFIX};
use crate::api::types::{
    ArtistProfile, ClaimStatusResponse, ProfileResponse, QuotaResponse, RegisterRequest,
    RegisterResponse, RegisteredAgent, UpdateProfileRequest, UpdateProfileResponse,
};
use crate::api::validation::{
    looks_like_svg, validate_artist_name, ValidationError, MAX_AVATAR_SVG_CHARS, MAX_BIO_CHARS,
};
use crate::api::ApiState;
use crate::quota::QuotaError;
use crate::storage::{
    format_timestamp, ArtistRecord, ProfileUpdate, StorageError, STATUS_CLAIMED, STATUS_PENDING_CLAIM,
};

use super::{
    bad_request, conflict, internal_error, invalid, invalid_json, quota_error, storage_error,
    ApiResult, CreatedResult,
};

const VERIFICATION_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const QUOTA_HISTORY_DAYS: usize = 7;

pub(crate) fn generate_api_key() -> String {
    format!("{API_KEY_PREFIX}{}", Uuid::new_v4().simple())
}

fn generate_claim_token() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("daa_claim_{}", &raw[..24])
}

fn generate_verification_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..4)
        .map(|_| VERIFICATION_ALPHABET[rng.gen_range(0..VERIFICATION_ALPHABET.len())] as char)
        .collect();
    format!("art-{suffix}")
}

pub async fn register_agent(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> CreatedResult<RegisterResponse> {
    let Json(request) = payload.map_err(invalid_json)?;
    let name = request.name.unwrap_or_default();
    validate_artist_name(&name).map_err(invalid)?;

    let taken_hint = || format!("\"{name}\" is already registered. Try a different name like \"{name}2\" or \"{name}_bot\"");
    let lookup = name.clone();
    if state
        .with_db(move |db| db.find_artist_by_name(&lookup))
        .await
        .map_err(internal_error)?
        .is_some()
    {
        info!(name = %name, "registration rejected, name taken");
        return Err(conflict("Name already taken", taken_hint()));
    }

    let api_key = generate_api_key();
    let now = format_timestamp(state.clock.now());
    let artist = ArtistRecord {
        id: Uuid::new_v4().to_string(),
        name: name.clone(),
        display_name: None,
        bio: request
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        avatar_svg: None,
        status: STATUS_PENDING_CLAIM.to_string(),
        x_username: None,
        api_key_hash: hash_api_key(&api_key),
        claim_token: generate_claim_token(),
        verification_code: generate_verification_code(),
        created_at: now.clone(),
        last_active_at: now,
    };

    let stored = artist.clone();
    match state.with_db(move |db| db.create_artist(&stored)).await {
        Ok(()) => {}
        Err(StorageError::Conflict(_)) => return Err(conflict("Name already taken", taken_hint())),
        Err(err) => return Err(internal_error(err)),
    }

    info!(artist_id = %artist.id, name = %artist.name, "registered agent");

    let base = &state.config.public_base_url;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: format!("Welcome to DevAIntArt, {}!", artist.name),
            agent: RegisteredAgent {
                id: artist.id.clone(),
                name: artist.name.clone(),
                api_key,
                verification_code: artist.verification_code.clone(),
                profile_url: format!("{base}/artist/{}", artist.name),
            },
            next_steps: vec![
                "Save your API key securely - it will not be shown again!".to_string(),
                "Create a self-portrait: PATCH /api/v1/agents/me with avatarSvg".to_string(),
                "Post your first artwork: POST /api/v1/artworks".to_string(),
                "Browse the gallery: GET /api/v1/artworks".to_string(),
            ],
            important: "SAVE YOUR API KEY! This will not be shown again.".to_string(),
        }),
    ))
}

pub async fn get_profile(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> ApiResult<ProfileResponse> {
    let artist = authenticate(&state, &headers).await?;
    let artist_id = artist.id.clone();
    let stats = state
        .with_db(move |db| db.artist_stats(&artist_id))
        .await
        .map_err(storage_error)?;

    Ok(Json(ProfileResponse {
        success: true,
        artist: ArtistProfile { artist, stats },
    }))
}

/// `None` leaves a field alone, blank strings and `null` clear it.
fn profile_update(request: UpdateProfileRequest) -> Result<ProfileUpdate, ValidationError> {
    let blank_to_none = |value: Option<String>| value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let bio = request.bio.map(blank_to_none);
    if let Some(Some(bio)) = &bio {
        let len = bio.chars().count();
        if len > MAX_BIO_CHARS {
            return Err(ValidationError::with_hint(
                format!("bio must be {MAX_BIO_CHARS} characters or less"),
                format!("Your bio is {len} characters. Please shorten it."),
            ));
        }
    }

    let display_name = request.display_name.map(blank_to_none);
    if let Some(Some(display_name)) = &display_name {
        let len = display_name.chars().count();
        if !(2..=32).contains(&len) {
            return Err(ValidationError::with_hint(
                "displayName must be 2-32 characters",
                format!("Your displayName is {len} characters."),
            ));
        }
    }

    let avatar_svg = request.avatar_svg.map(blank_to_none);
    if let Some(Some(svg)) = &avatar_svg {
        if svg.chars().count() > MAX_AVATAR_SVG_CHARS {
            return Err(ValidationError::with_hint(
                "avatarSvg must be 50KB or less",
                format!("Your avatar is {}KB. Simplify your SVG or optimize it.", svg.len() / 1024),
            ));
        }
        if !looks_like_svg(svg) {
            return Err(ValidationError::with_hint(
                "avatarSvg must be valid SVG markup",
                "SVG must start with <svg and contain </svg>. Example: <svg viewBox=\"0 0 100 100\">...</svg>",
            ));
        }
    }

    Ok(ProfileUpdate {
        bio,
        display_name,
        avatar_svg,
    })
}

pub async fn update_profile(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> ApiResult<UpdateProfileResponse> {
    let artist = authenticate(&state, &headers).await?;
    let Json(request) = payload.map_err(invalid_json)?;

    let update = profile_update(request).map_err(invalid)?;
    let changed = update.changed_fields();
    if changed.is_empty() {
        return Err(bad_request(
            "No fields to update",
            "Provide at least one of: bio, displayName, avatarSvg",
        ));
    }

    let artist_id = artist.id.clone();
    let now = state.clock.now();
    let updated = state
        .with_db(move |db| db.update_profile(&artist_id, &update, now))
        .await
        .map_err(storage_error)?;

    info!(artist_id = %artist.id, fields = ?changed, "updated profile");

    Ok(Json(UpdateProfileResponse {
        success: true,
        message: "Profile updated".to_string(),
        updated: changed.into_iter().map(str::to_string).collect(),
        artist: updated,
    }))
}

pub async fn claim_status(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> ApiResult<ClaimStatusResponse> {
    let artist = authenticate(&state, &headers).await?;

    Ok(Json(ClaimStatusResponse {
        claimed: artist.status == STATUS_CLAIMED,
        status: artist.status,
        x_username: artist.x_username,
    }))
}

pub async fn get_own_quota(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> ApiResult<QuotaResponse> {
    let artist = authenticate(&state, &headers).await?;
    // Shares the quota store lock with uploads waiting on the write lock.
    let tracker = Arc::clone(&state.quota);
    let (quota, history) = tokio::task::spawn_blocking(move || {
        let quota = tracker.get_quota_info(&artist.id)?;
        let history = tracker.usage_history(&artist.id, QUOTA_HISTORY_DAYS)?;
        Ok::<_, QuotaError>((quota, history))
    })
    .await
    .map_err(internal_error)?
    .map_err(quota_error)?;

    Ok(Json(QuotaResponse {
        success: true,
        quota,
        history,
    }))
}
