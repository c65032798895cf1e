//! HTTP surface tests driven through the router with `oneshot`.

use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use rsend_api::{create_router, ApiConfig, AppState};
use rsend_render::RenderConfig;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    cache: TempDir,
    _sources: TempDir,
}

fn png_fixture(path: &Path, width: u32, height: u32) {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
        .unwrap();
    std::fs::write(path, bytes).unwrap();
}

async fn test_app() -> TestApp {
    let sources = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();

    png_fixture(&sources.path().join("photo.png"), 80, 40);
    std::fs::write(sources.path().join("notes.txt"), b"not media").unwrap();

    let config = ApiConfig {
        source_root: sources.path().to_path_buf(),
        ..Default::default()
    };
    let render = RenderConfig {
        cache_root: cache.path().to_path_buf(),
        max_age: Duration::from_secs(3600),
        ..Default::default()
    };

    let state = AppState::from_config(config, &render).await.unwrap();
    TestApp {
        router: create_router(state, None),
        cache,
        _sources: sources,
    }
}

async fn get(router: &Router, uri: &str) -> axum::response::Response {
    router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn cache_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_health() {
    let app = test_app().await;

    let response = get(&app.router, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["renders_in_flight"], 0);
}

#[tokio::test]
async fn test_render_miss_then_hit() {
    let app = test_app().await;
    let uri = "/render?path=photo.png&width=40&height=20&format=png";

    let response = get(&app.router, uri).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "public, max-age=3600"
    );
    assert_eq!(response.headers()["x-cache"], "MISS");

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let img = image::load_from_memory(&bytes).unwrap();
    assert_eq!((img.width(), img.height()), (40, 20));

    let entries = cache_entries(app.cache.path());
    assert_eq!(entries.len(), 1);
    assert!(entries[0].starts_with("photo-"));
    assert!(entries[0].ends_with("-40x20.png"));

    let response = get(&app.router, uri).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-cache"], "HIT");
    assert_eq!(cache_entries(app.cache.path()).len(), 1);
}

#[tokio::test]
async fn test_default_format_is_jpeg() {
    let app = test_app().await;

    let response = get(&app.router, "/render?path=photo.png&trim=true").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");

    let entries = cache_entries(app.cache.path());
    assert!(entries[0].ends_with("-trimmed.jpg"), "{:?}", entries);
}

#[tokio::test]
async fn test_path_escape_is_forbidden() {
    let app = test_app().await;

    let response = get(&app.router, "/render?path=../photo.png").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(json_body(response).await["detail"].is_string());
}

#[tokio::test]
async fn test_missing_source_is_not_found() {
    let app = test_app().await;

    let response = get(&app.router, "/render?path=nope.png").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(cache_entries(app.cache.path()).is_empty());
}

#[tokio::test]
async fn test_invalid_options_are_bad_requests() {
    let app = test_app().await;

    for uri in [
        "/render?path=photo.png&width=0",
        "/render?path=photo.png&crop=1,2,3",
        "/render?path=photo.png&background=notacolor&square=true",
        "/render?path=photo.png&size=axb",
    ] {
        let response = get(&app.router, uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
    }
    assert!(cache_entries(app.cache.path()).is_empty());
}

#[tokio::test]
async fn test_unsupported_source_type() {
    let app = test_app().await;

    let response = get(&app.router, "/render?path=notes.txt").await;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_metrics_route_disabled_without_handle() {
    let app = test_app().await;

    let response = get(&app.router, "/metrics").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
