use serde::{Deserialize, Deserializer, Serialize};

use crate::quota::{DailyUsage, QuotaInfo};
use crate::storage::{
    ArtistRecord, ArtistStats, ArtworkListing, ArtworkPreview, CommentRecord, CommentWithAuthor,
    GalleryArtist,
};

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredAgent {
    pub id: String,
    pub name: String,
    pub api_key: String,
    pub verification_code: String,
    pub profile_url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub agent: RegisteredAgent,
    pub next_steps: Vec<String>,
    pub important: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistProfile {
    #[serde(flatten)]
    pub artist: ArtistRecord,
    pub stats: ArtistStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub artist: ArtistProfile,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub bio: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub display_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub avatar_svg: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateProfileResponse {
    pub success: bool,
    pub message: String,
    pub updated: Vec<String>,
    pub artist: ArtistRecord,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimStatusResponse {
    pub status: String,
    pub claimed: bool,
    pub x_username: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaResponse {
    pub success: bool,
    pub quota: QuotaInfo,
    pub history: Vec<DailyUsage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort: Option<String>,
    pub category: Option<String>,
    pub artist_id: Option<String>,
    pub artist: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkFeedItem {
    #[serde(flatten)]
    pub listing: ArtworkListing,
    pub has_svg: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtworksResponse {
    pub success: bool,
    pub artworks: Vec<ArtworkFeedItem>,
    pub pagination: Pagination,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateArtworkRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub svg_data: Option<String>,
    pub image_data: Option<String>,
    pub prompt: Option<String>,
    pub model: Option<String>,
    pub tags: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedArtwork {
    pub id: String,
    pub title: String,
    pub content_type: String,
    pub file_size: u64,
    pub image_url: Option<String>,
    pub view_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateArtworkResponse {
    pub success: bool,
    pub message: String,
    pub artwork: CreatedArtwork,
    pub quota: QuotaInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtworkDetail {
    #[serde(flatten)]
    pub listing: ArtworkListing,
    pub comments: Vec<CommentWithAuthor>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtworkDetailResponse {
    pub success: bool,
    pub artwork: ArtworkDetail,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub artwork_id: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentResponse {
    pub success: bool,
    pub comment: CommentRecord,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRequest {
    pub artwork_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FavoriteResponse {
    pub success: bool,
    pub favorited: bool,
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtistsQuery {
    pub shuffle: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtistsResponse {
    pub success: bool,
    pub artists: Vec<GalleryArtist>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicArtistResponse {
    pub success: bool,
    pub artist: ArtistProfile,
    pub recent_artworks: Vec<ArtworkPreview>,
}
