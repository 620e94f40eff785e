//! Resize service layer.
//!
//! This module turns a request for "this image, this size, this format"
//! into an encoded variant on disk, reusing earlier work wherever possible.
//!
//! # Architecture
//!
//! The resize service sits between the HTTP/CLI front end and the codec:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          HTTP Handlers / CLI            │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             Resize Service              │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │OriginalCache │  │     Codec       │  │
//! │  │  (decoded    │  │  (decode →      │  │
//! │  │   sources)   │  │ resize → encode)│  │
//! │  └──────────────┘  └─────────────────┘  │
//! └──────────┬─────────────────────┬────────┘
//!            │                     │
//!            ▼                     ▼
//! ┌────────────────────┐ ┌──────────────────┐
//! │      Fetcher       │ │   VariantCache   │
//! └────────────────────┘ └──────────────────┘
//! ```
//!
//! # Components
//!
//! - [`ResizeService`]: Main entry point, orchestrates the full pipeline
//! - [`ResizeRequest`]: Validated source URL, format and target box
//! - [`CacheKey`]: Stable name of a persisted variant
//! - [`OriginalCache`]: Bounded LRU of decoded source images
//! - [`resolve_dimensions`]: Clamps requested sizes to the source
//! - [`Codec`] / [`ImageCodec`]: Pixel decode, resize and encode
//!
//! # Example
//!
//! ```
//! use resize_proxy::resize::{resolve_dimensions, OutputFormat, ResizeRequest};
//!
//! let request = ResizeRequest::new("https://example.com/a.jpg", OutputFormat::Webp, 2000, 300).unwrap();
//! assert!(request.cache_key().as_str().ends_with("_2000x300.webp"));
//!
//! // An 800x400 source cannot be widened to 2000 pixels
//! assert_eq!(resolve_dimensions((2000, 300), (800, 400)), (800, 120));
//! ```

mod codec;
mod dimensions;
mod key;
mod memory;
mod service;

pub use codec::{Codec, ImageCodec, RESIZE_FILTER};
pub use dimensions::resolve_dimensions;
pub use key::{CacheKey, OutputFormat, ResizeRequest, JPEG_QUALITY, WEBP_QUALITY};
pub use memory::{OriginalCache, OriginalCacheStats, DEFAULT_ORIGINAL_CACHE_CAPACITY};
pub use service::{ResizeOutcome, ResizeService, VariantSource};
