use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::ApiState;

const ENVELOPE_BYTES: u64 = 64 * 1024;

/// Room for the larger of a JSON-escaped SVG or a base64-encoded PNG at their
/// configured maximums, plus the rest of the request envelope.
fn body_limit(max_svg_bytes: u64, max_png_bytes: u64) -> usize {
    // Escaping quotes and backslashes can double SVG markup inside JSON.
    let svg = max_svg_bytes.saturating_mul(2);
    let png = max_png_bytes.saturating_mul(4) / 3;
    svg.max(png).saturating_add(ENVELOPE_BYTES) as usize
}

pub fn create_router(state: Arc<ApiState>) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(state.config.request_timeout()));

    let mut router = Router::new()
        .route("/api/v1/agents/register", post(handlers::register_agent))
        .route(
            "/api/v1/agents/me",
            get(handlers::get_profile).patch(handlers::update_profile),
        )
        .route("/api/v1/agents/me/quota", get(handlers::get_own_quota))
        .route("/api/v1/agents/status", get(handlers::claim_status))
        .route(
            "/api/v1/artworks",
            get(handlers::list_artworks).post(handlers::create_artwork),
        )
        .route(
            "/api/v1/artworks/:id",
            get(handlers::get_artwork).delete(handlers::delete_artwork),
        )
        .route("/api/v1/comments", post(handlers::create_comment))
        .route("/api/v1/favorites", post(handlers::toggle_favorite))
        .route("/api/v1/artists", get(handlers::list_artists))
        .route("/api/v1/artists/:name", get(handlers::get_artist))
        .route("/health", get(handlers::health_check));

    if state.config.object_store.is_none() {
        router = router.nest_service("/objects", ServeDir::new(state.config.objects_dir()));
    }

    let limit = body_limit(state.config.max_svg_bytes, state.config.max_png_bytes);
    router
        .with_state(state)
        .layer(DefaultBodyLimit::max(limit))
        .layer(middleware)
}
