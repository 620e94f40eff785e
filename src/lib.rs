//! # Resize Proxy
//!
//! An on-demand image resizing proxy.
//!
//! Given a remote image URL, an output format and a target size, the proxy
//! returns a resized, re-encoded image and caches the result so repeated
//! requests for the same (source, size, format) cost neither network nor
//! CPU.
//!
//! ## Features
//!
//! - **Two-tier caching**: a bounded in-memory LRU of decoded originals and
//!   an unbounded on-disk store of encoded variants
//! - **Stable cache keys**: variants are named by a hash of the source URL
//!   plus size and format, so they stay valid across restarts
//! - **No upscaling**: requested sizes are clamped to the source image
//! - **HTTP and CLI front ends** sharing one pipeline
//!
//! ## Architecture
//!
//! - [`resize`] - Cache keys, dimension clamping, original cache, codec and orchestration
//! - [`storage`] - Persistent variant cache
//! - [`fetch`] - Source image retrieval
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use resize_proxy::{create_router, HttpFetcher, ImageCodec, ResizeService, RouterConfig, VariantCache};
//!
//! #[tokio::main]
//! async fn main() {
//!     let fetcher = HttpFetcher::new().expect("http client");
//!     let service = ResizeService::new(fetcher, ImageCodec::new(), VariantCache::new("./cache"));
//!     let router = create_router(service, RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod error;
pub mod fetch;
pub mod resize;
pub mod server;
pub mod storage;

// Re-export commonly used types
pub use config::{Config, OneShotRequest, RunMode};
pub use error::{CodecError, FetchError, ResizeError};
pub use fetch::{Fetcher, HttpFetcher};
pub use resize::{
    resolve_dimensions, CacheKey, Codec, ImageCodec, OriginalCache, OutputFormat, ResizeOutcome,
    ResizeRequest, ResizeService, VariantSource,
};
pub use server::{create_router, parse_resize_path, AppState, ErrorResponse, RouterConfig};
pub use storage::{sanitize_filename, VariantCache};
