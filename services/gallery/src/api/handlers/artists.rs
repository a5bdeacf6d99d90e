use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use rand::seq::SliceRandom;

use crate::api::types::{ArtistProfile, ArtistsQuery, ArtistsResponse, PublicArtistResponse};
use crate::api::ApiState;

use super::{not_found, storage_error, ApiResult};

const TOP_ARTWORKS_PER_ARTIST: usize = 3;
const RECENT_ARTWORKS_ON_PROFILE: usize = 6;

/// Artists with public work. Shuffled unless `shuffle=false`.
pub async fn list_artists(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<ArtistsQuery>,
) -> ApiResult<ArtistsResponse> {
    let mut artists = state
        .with_db(|db| db.list_gallery_artists(TOP_ARTWORKS_PER_ARTIST))
        .await
        .map_err(storage_error)?;

    if query.shuffle.unwrap_or(true) {
        artists.shuffle(&mut rand::thread_rng());
    }

    Ok(Json(ArtistsResponse {
        success: true,
        total: artists.len(),
        artists,
    }))
}

pub async fn get_artist(
    State(state): State<Arc<ApiState>>,
    Path(name): Path<String>,
) -> ApiResult<PublicArtistResponse> {
    let found = state
        .with_db(move |db| {
            let Some(artist) = db.find_artist_by_name(&name)? else {
                return Ok(None);
            };
            let stats = db.artist_stats(&artist.id)?;
            let recent = db.recent_artworks(&artist.id, RECENT_ARTWORKS_ON_PROFILE)?;
            Ok(Some((artist, stats, recent)))
        })
        .await
        .map_err(storage_error)?;
    let (artist, stats, recent_artworks) = found.ok_or_else(|| not_found("Artist not found"))?;

    Ok(Json(PublicArtistResponse {
        success: true,
        artist: ArtistProfile { artist, stats },
        recent_artworks,
    }))
}
