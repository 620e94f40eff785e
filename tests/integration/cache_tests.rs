//! Cache integration tests.
//!
//! Tests verify:
//! - Stored variants are served without touching the origin
//! - Decoded originals are reused across sizes and formats
//! - The /cache/{filename} read-through endpoint
//! - Bounded eviction of decoded originals

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tempfile::tempdir;
use tower::ServiceExt;

use resize_proxy::resize::{
    ImageCodec, OriginalCache, OutputFormat, ResizeRequest, ResizeService, VariantSource,
};
use resize_proxy::storage::VariantCache;

use super::test_utils::{
    create_png, decoded_size, encode_url, file_count, router_with, MockFetcher, PanicFetcher,
};

const SOURCE: &str = "https://images.example.com/photos/dog.png";

fn resize_uri(format: &str, width: u32, height: u32, url: &str) -> String {
    format!(
        "/format:{}/resize:fill:{}:{}/plain/{}",
        format,
        width,
        height,
        encode_url(url)
    )
}

async fn get(router: axum::Router, uri: &str) -> axum::response::Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    router.oneshot(request).await.unwrap()
}

// =============================================================================
// Variant Cache
// =============================================================================

#[tokio::test]
async fn test_second_request_served_from_disk() {
    let dir = tempdir().unwrap();
    let fetcher = MockFetcher::new().with_image(SOURCE, 120, 80);
    let router = router_with(fetcher.clone(), dir.path());
    let uri = resize_uri("png", 60, 40, SOURCE);

    let first = get(router.clone(), &uri).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers().get("x-resize-cache").unwrap(), "pipeline");
    let first_body = first.into_body().collect().await.unwrap().to_bytes();

    let second = get(router, &uri).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(second.headers().get("x-resize-cache").unwrap(), "disk");
    let second_body = second.into_body().collect().await.unwrap().to_bytes();

    assert_eq!(first_body, second_body);
    assert_eq!(fetcher.total_calls(), 1);
    assert_eq!(file_count(dir.path()), 1);
}

#[tokio::test]
async fn test_prepopulated_variant_skips_origin() {
    let dir = tempdir().unwrap();

    // Stored under the key a previous run would have produced
    let request = ResizeRequest::new(SOURCE, OutputFormat::Png, 30, 30).unwrap();
    let key = request.cache_key();
    let stored = create_png(30, 30);
    std::fs::write(dir.path().join(key.as_str()), &stored).unwrap();

    let router = router_with(PanicFetcher, dir.path());
    let response = get(router, &resize_uri("png", 30, 30, SOURCE)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-resize-cache").unwrap(), "disk");
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body.as_ref(), stored.as_slice());
}

#[tokio::test]
async fn test_jpg_and_jpeg_share_a_variant() {
    let dir = tempdir().unwrap();
    let fetcher = MockFetcher::new().with_image(SOURCE, 100, 100);
    let router = router_with(fetcher.clone(), dir.path());

    let first = get(router.clone(), &resize_uri("jpg", 20, 20, SOURCE)).await;
    assert_eq!(first.headers().get("x-resize-cache").unwrap(), "pipeline");

    let second = get(router, &resize_uri("jpeg", 20, 20, SOURCE)).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(second.headers().get("x-resize-cache").unwrap(), "disk");

    assert_eq!(file_count(dir.path()), 1);
}

// =============================================================================
// Original Cache
// =============================================================================

#[tokio::test]
async fn test_original_reused_across_sizes() {
    let dir = tempdir().unwrap();
    let fetcher = MockFetcher::new().with_image(SOURCE, 400, 300);
    let router = router_with(fetcher.clone(), dir.path());

    for (w, h) in [(100, 100), (200, 150), (50, 20)] {
        let response = get(router.clone(), &resize_uri("png", w, h, SOURCE)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(decoded_size(&body), (w, h));
    }

    assert_eq!(fetcher.calls_for(SOURCE), 1);
    assert_eq!(file_count(dir.path()), 3);

    let health = get(router, "/health").await;
    let body = health.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["memory_cache"]["entries"], 1);
    assert_eq!(json["memory_cache"]["hits"], 2);
    assert_eq!(json["memory_cache"]["misses"], 1);
}

#[tokio::test]
async fn test_original_eviction_refetches_oldest() {
    let dir = tempdir().unwrap();
    let urls: Vec<String> = (0..11)
        .map(|i| format!("https://images.example.com/{}.png", i))
        .collect();

    let mut fetcher = MockFetcher::new();
    for url in &urls {
        fetcher = fetcher.with_image(url.as_str(), 16, 16);
    }

    let service = ResizeService::with_original_cache(
        fetcher.clone(),
        ImageCodec::new(),
        VariantCache::new(dir.path()),
        OriginalCache::with_capacity(10),
    );

    for url in &urls {
        let request = ResizeRequest::new(url.as_str(), OutputFormat::Png, 8, 8).unwrap();
        let outcome = service.resize(&request).await.unwrap();
        assert_eq!(outcome.source, VariantSource::Pipeline);
    }

    assert_eq!(service.originals().len().await, 10);
    assert!(!service.originals().contains(&urls[0]).await);
    assert!(service.originals().contains(&urls[10]).await);

    // A new size of the evicted source has to go back to the origin
    let request = ResizeRequest::new(urls[0].as_str(), OutputFormat::Png, 4, 4).unwrap();
    service.resize(&request).await.unwrap();
    assert_eq!(fetcher.calls_for(&urls[0]), 2);

    // A new size of a resident source does not
    let request = ResizeRequest::new(urls[5].as_str(), OutputFormat::Png, 4, 4).unwrap();
    service.resize(&request).await.unwrap();
    assert_eq!(fetcher.calls_for(&urls[5]), 1);
}

// =============================================================================
// Read-through Endpoint
// =============================================================================

#[tokio::test]
async fn test_cache_endpoint_serves_artifact() {
    let dir = tempdir().unwrap();
    let fetcher = MockFetcher::new().with_image(SOURCE, 64, 64);
    let router = router_with(fetcher, dir.path());

    let response = get(router.clone(), &resize_uri("webp", 32, 32, SOURCE)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let resized = response.into_body().collect().await.unwrap().to_bytes();

    let key = ResizeRequest::new(SOURCE, OutputFormat::Webp, 32, 32)
        .unwrap()
        .cache_key();
    let cached = get(router, &format!("/cache/{}", key)).await;

    assert_eq!(cached.status(), StatusCode::OK);
    assert_eq!(cached.headers().get("content-type").unwrap(), "image/webp");
    assert!(cached.headers().get("x-resize-cache").is_none());
    let body = cached.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body, resized);
}

#[tokio::test]
async fn test_cache_endpoint_missing_is_404() {
    let dir = tempdir().unwrap();
    let router = router_with(PanicFetcher, dir.path());

    let response = get(router, "/cache/does_not_exist_1x1.jpg").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn test_cache_endpoint_cannot_escape_directory() {
    let root = tempdir().unwrap();
    let cache_dir = root.path().join("cache");
    std::fs::create_dir(&cache_dir).unwrap();
    std::fs::write(root.path().join("secret.txt"), b"top secret").unwrap();

    let router = router_with(PanicFetcher, &cache_dir);

    for uri in [
        "/cache/..%2Fsecret.txt",
        "/cache/..%2F..%2Fetc%2Fpasswd",
        "/cache/.hidden",
    ] {
        let response = get(router.clone(), uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}
