//! API integration tests for resize requests and error handling.
//!
//! Tests verify:
//! - Resizing to each output format
//! - Dimension clamping through the full pipeline
//! - Error cases (malformed path, unsupported format, origin failures)
//! - HTTP response codes and headers

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tempfile::tempdir;
use tower::ServiceExt;

use super::test_utils::{
    create_jpeg, decoded_size, encode_url, file_count, is_valid_jpeg, is_valid_png,
    is_valid_webp, router_with, MockFetcher, PanicFetcher,
};

const SOURCE: &str = "https://images.example.com/photos/cat.png";

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
// Successful Resizes
// =============================================================================

#[tokio::test]
async fn test_resize_to_jpeg() {
    let dir = tempdir().unwrap();
    let fetcher = MockFetcher::new().with_image(SOURCE, 640, 480);
    let router = router_with(fetcher, dir.path());

    let response = get(router, &resize_uri("jpg", 320, 240, SOURCE)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "image/jpeg"
    );
    assert_eq!(response.headers().get("x-resize-cache").unwrap(), "pipeline");
    assert!(response.headers().contains_key("cache-control"));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(is_valid_jpeg(&body));
    assert_eq!(decoded_size(&body), (320, 240));
}

#[tokio::test]
async fn test_resize_to_png_and_webp() {
    let dir = tempdir().unwrap();
    let fetcher = MockFetcher::new().with_image(SOURCE, 200, 100);
    let router = router_with(fetcher.clone(), dir.path());

    let png = get(router.clone(), &resize_uri("png", 50, 50, SOURCE)).await;
    assert_eq!(png.status(), StatusCode::OK);
    assert_eq!(png.headers().get("content-type").unwrap(), "image/png");
    let body = png.into_body().collect().await.unwrap().to_bytes();
    assert!(is_valid_png(&body));
    assert_eq!(decoded_size(&body), (50, 50));

    let webp = get(router, &resize_uri("webp", 40, 20, SOURCE)).await;
    assert_eq!(webp.status(), StatusCode::OK);
    assert_eq!(webp.headers().get("content-type").unwrap(), "image/webp");
    let body = webp.into_body().collect().await.unwrap().to_bytes();
    assert!(is_valid_webp(&body));
    assert_eq!(decoded_size(&body), (40, 20));

    // Second variant reused the decoded original
    assert_eq!(fetcher.calls_for(SOURCE), 1);
    assert_eq!(file_count(dir.path()), 2);
}

#[tokio::test]
async fn test_jpeg_source() {
    let dir = tempdir().unwrap();
    let url = "https://images.example.com/photo.jpg";
    let fetcher = MockFetcher::new().with_body(url, create_jpeg(300, 300));
    let router = router_with(fetcher, dir.path());

    let response = get(router, &resize_uri("png", 100, 60, url)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(decoded_size(&body), (100, 60));
}

#[tokio::test]
async fn test_width_clamped_to_source() {
    let dir = tempdir().unwrap();
    let fetcher = MockFetcher::new().with_image(SOURCE, 800, 400);
    let router = router_with(fetcher, dir.path());

    let response = get(router, &resize_uri("png", 2000, 300, SOURCE)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(decoded_size(&body), (800, 120));
}

#[tokio::test]
async fn test_height_clamped_width_kept() {
    let dir = tempdir().unwrap();
    let fetcher = MockFetcher::new().with_image(SOURCE, 800, 400);
    let router = router_with(fetcher, dir.path());

    let response = get(router, &resize_uri("png", 300, 2000, SOURCE)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(decoded_size(&body), (300, 400));
}

#[tokio::test]
async fn test_url_without_scheme_gets_https() {
    let dir = tempdir().unwrap();
    let fetcher = MockFetcher::new().with_image(SOURCE, 64, 64);
    let router = router_with(fetcher.clone(), dir.path());

    let response = get(
        router,
        &resize_uri("png", 16, 16, "images.example.com/photos/cat.png"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(fetcher.calls_for(SOURCE), 1);
}

// =============================================================================
// Error Handling
// =============================================================================

#[tokio::test]
async fn test_unsupported_format_is_500_and_writes_nothing() {
    let dir = tempdir().unwrap();
    let router = router_with(PanicFetcher, dir.path());

    let response = get(router, &resize_uri("bmp", 100, 100, SOURCE)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "unsupported_format");
    assert!(json["message"].as_str().unwrap().contains("bmp"));

    assert_eq!(file_count(dir.path()), 0);
}

#[tokio::test]
async fn test_malformed_paths_are_400() {
    let dir = tempdir().unwrap();
    let router = router_with(PanicFetcher, dir.path());

    for uri in [
        "/",
        "/format:jpg",
        "/format:jpg/resize:fill:10:10",
        "/format:jpg/resize:10:10/plain/example.com%2Fa.png",
        "/format:jpg/resize:fill:abc:10/plain/example.com%2Fa.png",
        "/format:jpg/resize:fill:0:10/plain/example.com%2Fa.png",
        "/format:jpg/resize:fill:10:10/plain/https%3A%2F%2F",
    ] {
        let response = get(router.clone(), uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }
}

#[tokio::test]
async fn test_origin_failure_is_500() {
    let dir = tempdir().unwrap();
    let router = router_with(MockFetcher::new(), dir.path());

    let response = get(router, &resize_uri("jpg", 10, 10, SOURCE)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "fetch_error");
    assert!(json["message"].as_str().unwrap().contains(SOURCE));
}

#[tokio::test]
async fn test_undecodable_source_is_500() {
    let dir = tempdir().unwrap();
    let fetcher = MockFetcher::new().with_body(SOURCE, &b"<html>gone</html>"[..]);
    let router = router_with(fetcher, dir.path());

    let response = get(router, &resize_uri("jpg", 10, 10, SOURCE)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "decode_error");
    assert_eq!(file_count(dir.path()), 0);
}

#[tokio::test]
async fn test_non_get_is_405() {
    let dir = tempdir().unwrap();
    let router = router_with(PanicFetcher, dir.path());

    for uri in [
        resize_uri("jpg", 10, 10, SOURCE),
        "/cache/abc.jpg".to_string(),
        "/".to_string(),
    ] {
        let request = Request::builder()
            .method("POST")
            .uri(&uri)
            .body(Body::empty())
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{}", uri);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "method_not_allowed");
    }
}

#[tokio::test]
async fn test_head_is_405_and_never_fetches() {
    let dir = tempdir().unwrap();
    let router = router_with(PanicFetcher, dir.path());

    for uri in [
        resize_uri("jpg", 1, 1, "example.com/a.png"),
        "/cache/x.jpg".to_string(),
        "/health".to_string(),
        "/".to_string(),
    ] {
        let request = Request::builder()
            .method("HEAD")
            .uri(&uri)
            .body(Body::empty())
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{}", uri);
    }

    assert_eq!(file_count(dir.path()), 0);
}

#[tokio::test]
async fn test_health() {
    let dir = tempdir().unwrap();
    let router = router_with(PanicFetcher, dir.path());

    let response = get(router, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["memory_cache"]["capacity"], 10);
    assert_eq!(json["memory_cache"]["entries"], 0);
}
