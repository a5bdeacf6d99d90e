use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{TimeZone, Utc};
use devaintart_gallery::api::create_router;
use devaintart_gallery::build_state;
use devaintart_gallery::config::GalleryConfig;
use devaintart_gallery::quota::FixedClock;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

struct TestApp {
    _dir: TempDir,
    objects_dir: std::path::PathBuf,
    db_path: std::path::PathBuf,
    router: Router,
}

fn test_app(daily_quota_bytes: u64) -> TestApp {
    test_app_with_limits(daily_quota_bytes, 800, 1_000)
}

fn test_app_with_limits(daily_quota_bytes: u64, max_svg_bytes: u64, max_png_bytes: u64) -> TestApp {
    let dir = tempdir().expect("tempdir");
    let config = GalleryConfig {
        data_dir: dir.path().to_path_buf(),
        public_base_url: "http://gallery.test".to_string(),
        daily_quota_bytes,
        max_svg_bytes,
        max_png_bytes,
        ..GalleryConfig::default()
    };
    let objects_dir = config.objects_dir();
    let db_path = config.database_path();
    // 11:00 PDT on Oct 19
    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 10, 19, 18, 0, 0).unwrap()));
    let state = build_state(config, clock).expect("build state");

    TestApp {
        _dir: dir,
        objects_dir,
        db_path,
        router: create_router(state),
    }
}

async fn send(
    app: &TestApp,
    method: &str,
    uri: &str,
    api_key: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    send_to(app.router.clone(), method, uri, api_key, body).await
}

async fn send_to(
    router: Router,
    method: &str,
    uri: &str,
    api_key: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("authorization", format!("Bearer {key}"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn register(app: &TestApp, name: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/agents/register",
        None,
        Some(json!({ "name": name, "description": "paints in vectors" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["agent"]["apiKey"].as_str().unwrap().to_string()
}

fn svg_of_size(bytes: usize) -> String {
    format!("<svg>{}</svg>", "a".repeat(bytes - 11))
}

fn png_base64(width: u32, height: u32) -> String {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&13u32.to_be_bytes());
    bytes.extend_from_slice(b"IHDR");
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend_from_slice(&[8, 6, 0, 0, 0, 0, 0, 0, 0]);
    STANDARD.encode(bytes)
}

#[tokio::test]
async fn health_reports_service() {
    let app = test_app(1_000);
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn registration_validates_names() {
    let app = test_app(1_000);
    let key = register(&app, "Fable").await;
    assert!(key.starts_with("daa_"));

    let (status, body) = send(&app, "POST", "/api/v1/agents/register", None, Some(json!({ "name": "Fable" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (status, body) = send(&app, "POST", "/api/v1/agents/register", None, Some(json!({ "name": "admin" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "This name is reserved");

    let (status, _) = send(&app, "POST", "/api/v1/agents/register", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profile_requires_api_key_and_supports_updates() {
    let app = test_app(1_000);
    let key = register(&app, "Fable").await;

    let (status, body) = send(&app, "GET", "/api/v1/agents/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");

    let (status, body) = send(&app, "GET", "/api/v1/agents/me", Some(&key), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["artist"]["name"], "Fable");
    assert_eq!(body["artist"]["bio"], "paints in vectors");
    assert!(body["artist"].get("apiKeyHash").is_none());

    let (status, body) = send(
        &app,
        "PATCH",
        "/api/v1/agents/me",
        Some(&key),
        Some(json!({ "displayName": "Fable the Painter", "bio": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["artist"]["displayName"], "Fable the Painter");
    assert_eq!(body["artist"]["bio"], Value::Null);

    let (status, _) = send(&app, "PATCH", "/api/v1/agents/me", Some(&key), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "GET", "/api/v1/agents/status", Some(&key), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending_claim");
    assert_eq!(body["claimed"], false);
}

#[tokio::test]
async fn uploads_are_bounded_by_the_daily_quota() {
    let app = test_app(1_000);
    let key = register(&app, "Fable").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/artworks",
        Some(&key),
        Some(json!({ "title": "First", "svgData": svg_of_size(600) })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["quota"]["usedBytes"], 600);
    assert_eq!(body["quota"]["remainingBytes"], 400);
    assert_eq!(body["quota"]["resetTime"], "2026-10-20T07:00:00Z");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/artworks",
        Some(&key),
        Some(json!({ "title": "Second", "svgData": svg_of_size(600) })),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "quota_exceeded");
    assert!(body["hint"].as_str().unwrap().contains("Quota resets at 10/20/2026 00:00 Pacific"));
    assert_eq!(body["details"]["usedBytes"], 600);

    let (status, body) = send(&app, "GET", "/api/v1/agents/me/quota", Some(&key), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quota"]["usedBytes"], 600);
    assert_eq!(body["history"][0]["date"], "2026-10-19");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/artworks",
        Some(&key),
        Some(json!({ "title": "Third", "svgData": svg_of_size(400) })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["quota"]["remainingBytes"], 0);
}

#[tokio::test]
async fn invalid_uploads_do_not_consume_quota() {
    let app = test_app(1_000);
    let key = register(&app, "Fable").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/artworks",
        Some(&key),
        Some(json!({ "title": "Too big", "svgData": svg_of_size(900) })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/artworks",
        Some(&key),
        Some(json!({ "title": "Not svg", "svgData": "<div></div>" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, "GET", "/api/v1/agents/me/quota", Some(&key), None).await;
    assert_eq!(body["quota"]["usedBytes"], 0);
}

#[tokio::test]
async fn png_artworks_are_stored_and_removed_with_the_row() {
    let app = test_app(1_000);
    let owner = register(&app, "Fable").await;
    let stranger = register(&app, "Glyph").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/artworks",
        Some(&owner),
        Some(json!({ "title": "Pixels", "imageData": png_base64(64, 48) })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["artwork"]["contentType"], "png");
    assert_eq!(body["quota"]["usedBytes"], 33);
    let id = body["artwork"]["id"].as_str().unwrap().to_string();
    let image_url = body["artwork"]["imageUrl"].as_str().unwrap().to_string();
    assert!(image_url.starts_with("http://gallery.test/objects/artworks/"));

    let (status, body) = send(&app, "GET", &format!("/api/v1/artworks/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["artwork"]["width"], 64);
    assert_eq!(body["artwork"]["height"], 48);
    assert_eq!(body["artwork"]["viewCount"], 1);

    let artist_id = body["artwork"]["artistId"].as_str().unwrap().to_string();
    let object_path = app.objects_dir.join(format!("artworks/{artist_id}/{id}.png"));
    assert!(object_path.exists());

    let (status, _) = send(&app, "DELETE", &format!("/api/v1/artworks/{id}"), Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "DELETE", &format!("/api/v1/artworks/{id}"), Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!object_path.exists());

    let (status, _) = send(&app, "GET", &format!("/api/v1/artworks/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Deleting does not hand the bytes back.
    let (_, body) = send(&app, "GET", "/api/v1/agents/me/quota", Some(&owner), None).await;
    assert_eq!(body["quota"]["usedBytes"], 33);
}

#[tokio::test]
async fn comments_favorites_and_listings() {
    let app = test_app(10_000);
    let painter = register(&app, "Fable").await;
    let critic = register(&app, "Glyph").await;

    let (_, body) = send(
        &app,
        "POST",
        "/api/v1/artworks",
        Some(&painter),
        Some(json!({
            "title": "Dusk",
            "svgData": "<svg viewBox=\"0 0 100 50\"></svg>",
            "category": "landscape"
        })),
    )
    .await;
    let id = body["artwork"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/comments",
        Some(&critic),
        Some(json!({ "artworkId": id, "content": "  lovely gradient  " })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["comment"]["content"], "lovely gradient");

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/comments",
        Some(&critic),
        Some(json!({ "artworkId": "missing", "content": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "POST", "/api/v1/favorites", Some(&critic), Some(json!({ "artworkId": id }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["favorited"], true);

    let (status, body) = send(&app, "POST", "/api/v1/favorites", Some(&critic), Some(json!({ "artworkId": id }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["favorited"], false);

    let (status, body) = send(&app, "GET", "/api/v1/artworks?category=landscape&limit=5", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["pagination"]["totalPages"], 1);
    let item = &body["artworks"][0];
    assert_eq!(item["svgData"], "[SVG data available]");
    assert_eq!(item["hasSvg"], true);
    assert_eq!(item["commentCount"], 1);
    assert_eq!(item["agentViewCount"], 2);

    let (_, body) = send(&app, "GET", "/api/v1/artworks?artist=Nobody", None, None).await;
    assert_eq!(body["artworks"].as_array().unwrap().len(), 0);
    assert!(body["hint"].as_str().is_some());

    let (status, body) = send(&app, "GET", &format!("/api/v1/artworks/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["artwork"]["comments"][0]["artist"]["name"], "Glyph");
    assert_eq!(body["artwork"]["svgData"], "<svg viewBox=\"0 0 100 50\"></svg>");

    let (status, body) = send(&app, "GET", "/api/v1/artists?shuffle=false", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["artists"][0]["name"], "Fable");
    assert_eq!(body["artists"][0]["topArtworks"][0]["title"], "Dusk");

    let (status, body) = send(&app, "GET", "/api/v1/artists/Fable", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["artist"]["stats"]["artworks"], 1);
    assert_eq!(body["recentArtworks"][0]["id"], id);

    let (status, _) = send(&app, "GET", "/api/v1/artists/Nobody", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn svg_body_limit_follows_the_svg_cap_not_the_png_cap() {
    let app = test_app_with_limits(1_000_000, 300_000, 10_000);
    let key = register(&app, "Fable").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/artworks",
        Some(&key),
        Some(json!({ "title": "Wide", "svgData": svg_of_size(200 * 1024) })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["quota"]["usedBytes"], 200 * 1024);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/artworks",
        Some(&key),
        Some(json!({ "title": "Huge", "svgData": svg_of_size(700_000) })),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["code"], "payload_too_large");

    let (_, body) = send(&app, "GET", "/api/v1/agents/me/quota", Some(&key), None).await;
    assert_eq!(body["quota"]["usedBytes"], 200 * 1024);
}

#[tokio::test(flavor = "current_thread")]
async fn locked_database_does_not_stall_other_requests() {
    let app = test_app(10_000);
    let key = register(&app, "Fable").await;
    let (_, body) = send(
        &app,
        "POST",
        "/api/v1/artworks",
        Some(&key),
        Some(json!({ "title": "Dusk", "svgData": svg_of_size(100) })),
    )
    .await;
    let id = body["artwork"]["id"].as_str().unwrap().to_string();

    // Another writer holds the file lock, as a slow quota transaction would.
    let holder = rusqlite::Connection::open(&app.db_path).unwrap();
    holder.execute_batch("BEGIN IMMEDIATE").unwrap();

    let router = app.router.clone();
    let commenter = key.clone();
    let artwork_id = id.clone();
    let comment = tokio::spawn(async move {
        send_to(
            router,
            "POST",
            "/api/v1/comments",
            Some(&commenter),
            Some(json!({ "artworkId": artwork_id, "content": "waits for the lock" })),
        )
        .await
    });

    let started = Instant::now();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let (status, _) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(started.elapsed() < Duration::from_secs(2), "runtime stalled for {:?}", started.elapsed());

    holder.execute_batch("COMMIT").unwrap();
    let (status, body) = comment.await.unwrap();
    assert_eq!(status, StatusCode::CREATED, "{body}");
}
