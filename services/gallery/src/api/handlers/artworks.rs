use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::auth::authenticate;
use crate::api::types::{
    ArtworkDetail, ArtworkDetailResponse, ArtworkFeedItem, ArtworkQuery, ArtworksResponse,
    CreateArtworkRequest, CreateArtworkResponse, CreatedArtwork, MessageResponse, Pagination,
};
use crate::api::validation::{
    check_length, decode_png, normalize, validate_svg, ValidationError, MAX_DESCRIPTION_CHARS,
    MAX_TAGS_CHARS, MAX_TITLE_CHARS,
};
use crate::api::ApiState;
use crate::objects::{artwork_object_key, PNG_CONTENT_TYPE};
use crate::storage::{format_timestamp, ArtworkFilter, ArtworkKind, ArtworkRecord, ArtworkSort};

use super::{
    forbidden, internal_error, invalid, invalid_json, not_found, quota_error,
    storage_error, ApiResult, CreatedResult,
};

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 50;
const DETAIL_COMMENT_LIMIT: usize = 50;
const SVG_PLACEHOLDER: &str = "[SVG data available]";

pub async fn list_artworks(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<ArtworkQuery>,
) -> ApiResult<ArtworksResponse> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let sort = match query.sort.as_deref() {
        Some("popular") => ArtworkSort::Popular,
        _ => ArtworkSort::Recent,
    };

    let mut filter = ArtworkFilter {
        category: query.category,
        artist_id: query.artist_id,
        artist_name: None,
        sort,
        page,
        limit,
    };

    if let Some(name) = query.artist {
        let lookup = name.clone();
        let found = state
            .with_db(move |db| db.find_artist_by_name(&lookup))
            .await
            .map_err(storage_error)?;
        match found {
            Some(artist) => filter.artist_id = Some(artist.id),
            None => {
                return Ok(Json(ArtworksResponse {
                    success: true,
                    artworks: Vec::new(),
                    pagination: Pagination {
                        page,
                        limit,
                        total: 0,
                        total_pages: 0,
                    },
                    hint: Some(format!("No artist found with name \"{name}\"")),
                }));
            }
        }
    }

    let (listings, total) = state
        .with_db(move |db| db.list_artworks(&filter))
        .await
        .map_err(storage_error)?;
    let artworks = listings
        .into_iter()
        .map(|mut listing| {
            let has_svg = listing.artwork.svg_data.is_some();
            if has_svg {
                listing.artwork.svg_data = Some(SVG_PLACEHOLDER.to_string());
            }
            ArtworkFeedItem { listing, has_svg }
        })
        .collect();

    Ok(Json(ArtworksResponse {
        success: true,
        artworks,
        pagination: Pagination {
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit as u64),
        },
        hint: None,
    }))
}

/// Validated upload payload, before any quota is charged.
#[derive(Debug)]
enum Payload {
    Svg(String),
    Png(Vec<u8>),
}

#[derive(Debug)]
struct PreparedUpload {
    title: String,
    description: Option<String>,
    payload: Payload,
    size_bytes: u64,
    width: Option<u32>,
    height: Option<u32>,
}

fn prepare_upload(
    request: &mut CreateArtworkRequest,
    max_svg_bytes: u64,
    max_png_bytes: u64,
) -> Result<PreparedUpload, ValidationError> {
    let title = normalize(request.title.take()).ok_or_else(|| {
        ValidationError::with_hint(
            "title is required",
            "Every artwork needs a title. Example: {\"title\": \"My Art\", \"svgData\": \"<svg>...</svg>\"}",
        )
    })?;
    check_length("title", Some(&title), MAX_TITLE_CHARS)?;

    let description = normalize(request.description.take());
    check_length("description", description.as_deref(), MAX_DESCRIPTION_CHARS)?;
    check_length("tags", request.tags.as_deref(), MAX_TAGS_CHARS)?;

    match (request.svg_data.take(), request.image_data.take()) {
        (Some(svg), None) => {
            let upload = validate_svg(&svg, max_svg_bytes)?;
            Ok(PreparedUpload {
                title,
                description,
                payload: Payload::Svg(svg),
                size_bytes: upload.size_bytes,
                width: upload.width,
                height: upload.height,
            })
        }
        (None, Some(encoded)) => {
            let upload = decode_png(&encoded, max_png_bytes)?;
            Ok(PreparedUpload {
                title,
                description,
                size_bytes: upload.bytes.len() as u64,
                width: Some(upload.width),
                height: Some(upload.height),
                payload: Payload::Png(upload.bytes),
            })
        }
        (Some(_), Some(_)) => Err(ValidationError::with_hint(
            "provide either svgData or imageData, not both",
            "Send SVG markup as svgData, or a base64 PNG as imageData",
        )),
        (None, None) => Err(ValidationError::with_hint(
            "svgData or imageData is required",
            "Provide your artwork as SVG markup (svgData) or a base64-encoded PNG (imageData)",
        )),
    }
}

pub async fn create_artwork(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    payload: Result<Json<CreateArtworkRequest>, JsonRejection>,
) -> CreatedResult<CreateArtworkResponse> {
    let artist = authenticate(&state, &headers).await?;
    let Json(mut request) = payload.map_err(invalid_json)?;

    let upload = prepare_upload(
        &mut request,
        state.config.max_svg_bytes,
        state.config.max_png_bytes,
    )
    .map_err(invalid)?;

    // The quota transaction can wait on SQLite's write lock.
    let tracker = Arc::clone(&state.quota);
    let artist_id = artist.id.clone();
    let size_bytes = upload.size_bytes;
    let quota = tokio::task::spawn_blocking(move || tracker.check_and_record_upload(&artist_id, size_bytes))
        .await
        .map_err(internal_error)?
        .map_err(quota_error)?;

    let artwork_id = Uuid::new_v4().to_string();
    let (content_type, svg_data, image_url, object_key) = match upload.payload {
        Payload::Svg(svg) => (ArtworkKind::Svg, Some(svg), None, None),
        Payload::Png(bytes) => {
            let key = artwork_object_key(&artist.id, &artwork_id);
            let url = state
                .objects
                .put(&key, bytes, PNG_CONTENT_TYPE)
                .await
                .map_err(internal_error)?;
            (ArtworkKind::Png, None, Some(url), Some(key))
        }
    };

    let now = state.clock.now();
    let artwork = ArtworkRecord {
        id: artwork_id,
        artist_id: artist.id.clone(),
        title: upload.title,
        description: upload.description,
        content_type,
        svg_data,
        image_url,
        object_key,
        file_size: upload.size_bytes,
        width: upload.width,
        height: upload.height,
        prompt: normalize(request.prompt),
        model: normalize(request.model),
        tags: normalize(request.tags),
        category: normalize(request.category),
        is_public: true,
        view_count: 0,
        agent_view_count: 0,
        created_at: format_timestamp(now),
    };

    let record = artwork.clone();
    if let Err(err) = state.with_db(move |db| db.insert_artwork(&record)).await {
        if let Some(key) = &artwork.object_key {
            if let Err(cleanup) = state.objects.delete(key).await {
                warn!(key = %key, error = %cleanup, "failed to remove orphaned object");
            }
        }
        return Err(storage_error(err));
    }
    let artist_id = artist.id.clone();
    state
        .with_db(move |db| db.touch_artist(&artist_id, now))
        .await
        .map_err(storage_error)?;

    info!(
        artwork_id = %artwork.id,
        artist = %artist.name,
        kind = %artwork.content_type,
        bytes = artwork.file_size,
        used_bytes = quota.used_bytes,
        "artwork created"
    );

    let view_url = format!("{}/artwork/{}", state.config.public_base_url, artwork.id);
    Ok((
        StatusCode::CREATED,
        Json(CreateArtworkResponse {
            success: true,
            message: "Artwork created successfully!".to_string(),
            artwork: CreatedArtwork {
                id: artwork.id,
                title: artwork.title,
                content_type: artwork.content_type.to_string(),
                file_size: artwork.file_size,
                image_url: artwork.image_url,
                view_url,
            },
            quota,
        }),
    ))
}

pub async fn get_artwork(
    State(state): State<Arc<ApiState>>,
    Path(artwork_id): Path<String>,
) -> ApiResult<ArtworkDetailResponse> {
    let found = state
        .with_db(move |db| {
            let Some(mut listing) = db.get_artwork_listing(&artwork_id)? else {
                return Ok(None);
            };
            db.increment_view_count(&artwork_id)?;
            listing.artwork.view_count += 1;
            let comments = db.list_comments(&artwork_id, DETAIL_COMMENT_LIMIT)?;
            Ok(Some((listing, comments)))
        })
        .await
        .map_err(storage_error)?;
    let (listing, comments) = found.ok_or_else(|| not_found("Artwork not found"))?;

    Ok(Json(ArtworkDetailResponse {
        success: true,
        artwork: ArtworkDetail { listing, comments },
    }))
}

pub async fn delete_artwork(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(artwork_id): Path<String>,
) -> ApiResult<MessageResponse> {
    let artist = authenticate(&state, &headers).await?;

    let lookup = artwork_id.clone();
    let artwork = state
        .with_db(move |db| db.get_artwork(&lookup))
        .await
        .map_err(storage_error)?
        .ok_or_else(|| not_found("Artwork not found"))?;
    if artwork.artist_id != artist.id {
        return Err(forbidden("You can only delete your own artwork"));
    }

    let target = artwork_id.clone();
    let deleted = state
        .with_db(move |db| db.delete_artwork(&target))
        .await
        .map_err(storage_error)?;
    if let Some(key) = &deleted.object_key {
        if let Err(err) = state.objects.delete(key).await {
            warn!(key = %key, error = %err, "artwork deleted but object removal failed");
        }
    }
    let artist_id = artist.id.clone();
    let now = state.clock.now();
    state
        .with_db(move |db| db.touch_artist(&artist_id, now))
        .await
        .map_err(storage_error)?;

    info!(artwork_id = %artwork_id, artist = %artist.name, "artwork deleted");
    Ok(Json(MessageResponse {
        success: true,
        message: format!("Artwork \"{}\" deleted", deleted.title),
    }))
}
