//! HTTP request handlers for the resize proxy.
//!
//! # Endpoints
//!
//! - `GET /format:{fmt}/resize:{mode}:{width}:{height}/{ignored}/{url}` - Resize and serve
//! - `GET /cache/{filename}` - Serve an already computed variant
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, error, warn};
use url::Url;

use crate::error::ResizeError;
use crate::fetch::Fetcher;
use crate::resize::{Codec, OriginalCacheStats, OutputFormat, ResizeRequest, ResizeService};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the resize service.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<F: Fetcher, C: Codec> {
    /// The resize service, shared by every request
    pub service: Arc<ResizeService<F, C>>,

    /// Cache-Control max-age in seconds for served images
    pub cache_max_age: u32,
}

impl<F: Fetcher, C: Codec> AppState<F, C> {
    /// Create a new application state with a one hour max-age.
    pub fn new(service: ResizeService<F, C>) -> Self {
        Self::with_cache_max_age(service, 3600)
    }

    /// Create a new application state with custom cache max-age.
    pub fn with_cache_max_age(service: ResizeService<F, C>, cache_max_age: u32) -> Self {
        Self {
            service: Arc::new(service),
            cache_max_age,
        }
    }
}

impl<F: Fetcher, C: Codec> Clone for AppState<F, C> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            cache_max_age: self.cache_max_age,
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "invalid_request")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,

    /// Decoded-original cache counters
    pub memory_cache: OriginalCacheStats,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// HTTP status and error type identifier for an error.
pub fn error_status(err: &ResizeError) -> (StatusCode, &'static str) {
    match err {
        ResizeError::InvalidRequest { .. } => (StatusCode::BAD_REQUEST, "invalid_request"),
        ResizeError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
        ResizeError::MethodNotAllowed { .. } => {
            (StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed")
        }
        ResizeError::Fetch { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "fetch_error"),
        ResizeError::Decode { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "decode_error"),
        ResizeError::UnsupportedFormat { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "unsupported_format")
        }
        ResizeError::Encode { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "encode_error"),
        ResizeError::FileSystem { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "file_system_error"),
    }
}

/// Convert ResizeError to HTTP response.
///
/// - 5xx errors are logged at ERROR level
/// - 404s are logged at DEBUG level
/// - other 4xx errors are logged at WARN level
impl IntoResponse for ResizeError {
    fn into_response(self) -> Response {
        let (status, error_type) = error_status(&self);
        let message = self.to_string();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Resource not found: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);

        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Path Parsing
// =============================================================================

/// Parse a resize path into a validated request.
///
/// Expects the raw (still percent-encoded) request path:
///
/// ```text
/// /format:<fmt>/resize:<mode>:<width>:<height>/<ignored>/<url-encoded source>
/// ```
///
/// The resize mode and the segment after the resize parameters are accepted but
/// not interpreted. Everything after the ignored segment is the source URL;
/// it is percent-decoded and gets `https://` prepended when it does not
/// start with `http`.
pub fn parse_resize_path(path: &str) -> Result<ResizeRequest, ResizeError> {
    let invalid = |reason: String| ResizeError::InvalidRequest { reason };

    let mut segments = path.trim_start_matches('/').splitn(4, '/');
    let (format_segment, resize_segment, _ignored, encoded_url) = match (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) {
        (Some(f), Some(r), Some(i), Some(u)) => (f, r, i, u),
        _ => return Err(invalid("invalid request format".to_string())),
    };

    let format_token = format_segment
        .strip_prefix("format:")
        .ok_or_else(|| invalid(format!("expected format:<fmt>, got '{}'", format_segment)))?;

    let params: Vec<&str> = resize_segment
        .strip_prefix("resize:")
        .ok_or_else(|| {
            invalid(format!(
                "expected resize:<mode>:<width>:<height>, got '{}'",
                resize_segment
            ))
        })?
        .split(':')
        .collect();
    let (width, height) = match params.as_slice() {
        [_mode, width, height] => (parse_dimension(width)?, parse_dimension(height)?),
        _ => return Err(invalid("invalid resize parameters".to_string())),
    };

    let source_url = parse_source_url(encoded_url)?;
    let format: OutputFormat = format_token.parse()?;

    ResizeRequest::new(source_url, format, width, height)
}

fn parse_dimension(raw: &str) -> Result<u32, ResizeError> {
    match raw.parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ResizeError::InvalidRequest {
            reason: format!("dimension must be a positive integer, got '{}'", raw),
        }),
    }
}

/// Decode and validate the source URL segment.
pub fn parse_source_url(encoded: &str) -> Result<String, ResizeError> {
    let invalid = |reason: String| ResizeError::InvalidRequest { reason };

    let decoded = urlencoding::decode(encoded)
        .map_err(|e| invalid(format!("invalid URL encoding: {}", e)))?;
    if decoded.is_empty() {
        return Err(invalid("missing source URL".to_string()));
    }

    let candidate = if decoded.starts_with("http") {
        decoded.into_owned()
    } else {
        format!("https://{}", decoded)
    };

    let parsed = Url::parse(&candidate)
        .map_err(|e| invalid(format!("invalid source URL '{}': {}", candidate, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(invalid(format!("invalid source URL '{}'", candidate)));
    }

    Ok(candidate)
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle resize requests.
///
/// # Endpoint
///
/// `GET /format:{fmt}/resize:{mode}:{width}:{height}/{ignored}/{url}`
///
/// # Response
///
/// - `200 OK`: Encoded image with `Content-Type: image/{fmt}`
/// - `400 Bad Request`: Malformed path, dimensions or URL
/// - `500 Internal Server Error`: Unsupported format or pipeline failure
///
/// # Headers
///
/// - `Cache-Control: public, max-age={cache_max_age}`
/// - `X-Resize-Cache: disk|pipeline`
pub async fn resize_handler<F, C>(
    State(state): State<AppState<F, C>>,
    uri: Uri,
) -> Result<Response, ResizeError>
where
    F: Fetcher + 'static,
    C: Codec + 'static,
{
    let request = parse_resize_path(uri.path())?;

    let outcome = state.service.resize(&request).await?;
    let data = state.service.variants().read(&outcome.key).await?;

    Ok(image_response(
        data,
        request.format.mime_type(),
        state.cache_max_age,
        Some(outcome.source.as_str()),
    ))
}

/// Handle requests for already computed variants.
///
/// # Endpoint
///
/// `GET /cache/{filename}`
///
/// The file name is confined to the cache directory before lookup, so
/// traversal attempts resolve to a (missing) file inside it.
///
/// # Response
///
/// - `200 OK`: The stored bytes
/// - `404 Not Found`: No such artifact
pub async fn cache_handler<F, C>(
    State(state): State<AppState<F, C>>,
    Path(filename): Path<String>,
) -> Result<Response, ResizeError>
where
    F: Fetcher + 'static,
    C: Codec + 'static,
{
    debug!(filename = %filename, "Cache read-through");
    let data = state.service.variants().read_file(&filename).await?;

    let content_type = OutputFormat::from_filename(&filename)
        .map(|f| f.mime_type())
        .unwrap_or("application/octet-stream");

    Ok(image_response(data, content_type, state.cache_max_age, None))
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "memory_cache": { "entries": 3, "capacity": 10, "hits": 12, "misses": 3 }
/// }
/// ```
pub async fn health_handler<F, C>(State(state): State<AppState<F, C>>) -> Json<HealthResponse>
where
    F: Fetcher + 'static,
    C: Codec + 'static,
{
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        memory_cache: state.service.originals().stats().await,
    })
}

/// Handle requests that match no route.
///
/// Also mounted as the HEAD handler of every route, since axum would
/// otherwise answer HEAD with the GET handler. Non-GET methods get 405,
/// anything else is a malformed path.
pub async fn fallback_handler(method: Method, uri: Uri) -> ResizeError {
    if method != Method::GET {
        return ResizeError::MethodNotAllowed {
            method: method.to_string(),
        };
    }

    ResizeError::InvalidRequest {
        reason: format!("invalid request format: {}", uri.path()),
    }
}

fn image_response(
    data: Bytes,
    content_type: &'static str,
    cache_max_age: u32,
    cache_source: Option<&'static str>,
) -> Response {
    let mut response = (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CACHE_CONTROL,
                format!("public, max-age={}", cache_max_age),
            ),
        ],
        Body::from(data),
    )
        .into_response();

    if let Some(source) = cache_source {
        response
            .headers_mut()
            .insert("x-resize-cache", header::HeaderValue::from_static(source));
    }

    response
}

// =============================================================================
// Tests
// =============================================================================
