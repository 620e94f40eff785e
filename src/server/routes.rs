//! Router configuration for the resize proxy.
//!
//! This module defines the HTTP routes and applies middleware for CORS and
//! request tracing.
//!
//! # Route Structure
//!
//! ```text
//! /health                                               - Health check
//! /cache/{filename}                                     - Stored variant
//! /format:{fmt}/resize:{mode}:{w}:{h}/{ignored}/{url}   - Resize (catch-all)
//! ```
//!
//! Only GET is routed; every other method, HEAD included, gets 405.
//!
//! # Example
//!
//! ```ignore
//! use resize_proxy::server::routes::{create_router, RouterConfig};
//! use resize_proxy::resize::{ImageCodec, ResizeService};
//!
//! let service = ResizeService::new(fetcher, ImageCodec::new(), VariantCache::new("./cache"));
//! let router = create_router(service, RouterConfig::new().with_cache_max_age(600));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{routing::get, Router};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{cache_handler, fallback_handler, health_handler, resize_handler, AppState};
use crate::fetch::Fetcher;
use crate::resize::{Codec, ResizeService};

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control max-age in seconds
    pub cache_max_age: u32,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a router configuration.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Cache max-age is 1 hour (3600 seconds)
    /// - Tracing is enabled
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            cache_max_age: 3600,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Set the Cache-Control max-age in seconds.
    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// # Arguments
///
/// * `service` - The resize service shared by all handlers
/// * `config` - Router configuration
pub fn create_router<F, C>(service: ResizeService<F, C>, config: RouterConfig) -> Router
where
    F: Fetcher + 'static,
    C: Codec + 'static,
{
    let app_state = AppState::with_cache_max_age(service, config.cache_max_age);
    let cors = build_cors_layer(&config);

    let router = Router::new()
        .route(
            "/health",
            get(health_handler::<F, C>)
                .head(fallback_handler)
                .fallback(fallback_handler),
        )
        .route(
            "/cache/{filename}",
            get(cache_handler::<F, C>)
                .head(fallback_handler)
                .fallback(fallback_handler),
        )
        .route(
            "/{*path}",
            get(resize_handler::<F, C>)
                .head(fallback_handler)
                .fallback(fallback_handler),
        )
        .fallback(fallback_handler)
        .with_state(app_state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
