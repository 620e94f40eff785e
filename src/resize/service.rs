//! Resize Service for orchestrating variant generation.
//!
//! The ResizeService is the main entry point for resize requests. It
//! orchestrates:
//! - Cache key derivation
//! - Disk cache short-circuit
//! - Decoded-original lookup, or fetch and decode on a miss
//! - Dimension clamping
//! - Resize, encode and persist
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        ResizeService                            │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │                       resize()                          │    │
//! │  │  1. Derive key        5. Resolve dimensions             │    │
//! │  │  2. Disk check        6. Resize (fill, Lanczos)         │    │
//! │  │  3. Memory check      7. Encode                         │    │
//! │  │  4. Fetch + decode    8. Persist                        │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │        │               │               │               │        │
//! │        ▼               ▼               ▼               ▼        │
//! │  ┌────────────┐ ┌─────────────┐ ┌───────────┐ ┌──────────────┐  │
//! │  │VariantCache│ │OriginalCache│ │  Fetcher  │ │    Codec     │  │
//! │  └────────────┘ └─────────────┘ └───────────┘ └──────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Decode, resize and encode run on tokio's blocking pool so a large
//! resize never stalls the async workers serving other requests.
//!
//! No step is retried. A decoded original stays in the memory cache even
//! when a later step fails. Concurrent misses on the same request are not
//! coalesced; each does the full work and the disk write is idempotent.

use std::sync::Arc;

use image::DynamicImage;
use tracing::{debug, info};

use crate::error::{CodecError, ResizeError};
use crate::fetch::Fetcher;
use crate::storage::VariantCache;

use super::codec::{Codec, RESIZE_FILTER};
use super::dimensions::resolve_dimensions;
use super::key::{CacheKey, ResizeRequest};
use super::memory::OriginalCache;

// =============================================================================
// Resize Outcome
// =============================================================================

/// Where a successful request's artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantSource {
    /// The artifact already existed on disk
    Disk,
    /// The artifact was produced by this call
    Pipeline,
}

impl VariantSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariantSource::Disk => "disk",
            VariantSource::Pipeline => "pipeline",
        }
    }
}

/// Result of a successful resize request.
#[derive(Debug, Clone)]
pub struct ResizeOutcome {
    /// Key naming the artifact in the variant cache
    pub key: CacheKey,

    /// How the artifact was obtained
    pub source: VariantSource,

    /// Dimensions actually passed to the resize step (pipeline only)
    pub effective_size: Option<(u32, u32)>,
}

// =============================================================================
// Resize Service
// =============================================================================

/// Service that turns resize requests into persisted variants.
///
/// The service owns the process-wide cache state. Build it once at startup
/// and share it (typically behind an `Arc`) with every request handler.
///
/// # Type Parameters
///
/// * `F` - Fetcher for source images
/// * `C` - Pixel codec
///
/// # Example
///
/// ```ignore
/// use resize_proxy::fetch::HttpFetcher;
/// use resize_proxy::resize::{ImageCodec, OutputFormat, ResizeRequest, ResizeService};
/// use resize_proxy::storage::VariantCache;
///
/// let service = ResizeService::new(HttpFetcher::new()?, ImageCodec::new(), VariantCache::new("./cache"));
///
/// let request = ResizeRequest::new("https://example.com/cat.jpg", OutputFormat::Webp, 300, 200)?;
/// let outcome = service.resize(&request).await?;
///
/// println!("{} ({})", outcome.key, outcome.source.as_str());
/// ```
pub struct ResizeService<F: Fetcher, C: Codec> {
    fetcher: F,
    codec: Arc<C>,
    originals: OriginalCache,
    variants: VariantCache,
}

impl<F: Fetcher, C: Codec + 'static> ResizeService<F, C> {
    /// Create a service with a default-capacity original cache.
    pub fn new(fetcher: F, codec: C, variants: VariantCache) -> Self {
        Self::with_original_cache(fetcher, codec, variants, OriginalCache::new())
    }

    /// Create a service with an explicit original cache.
    pub fn with_original_cache(
        fetcher: F,
        codec: C,
        variants: VariantCache,
        originals: OriginalCache,
    ) -> Self {
        Self {
            fetcher,
            codec: Arc::new(codec),
            originals,
            variants,
        }
    }

    /// Produce (or find) the variant for `request`.
    ///
    /// # Errors
    ///
    /// - [`ResizeError::Fetch`] if the source cannot be downloaded
    /// - [`ResizeError::Decode`] if the source is not a readable image
    /// - [`ResizeError::Encode`] if the resized image cannot be encoded
    /// - [`ResizeError::FileSystem`] if the variant cannot be persisted
    pub async fn resize(&self, request: &ResizeRequest) -> Result<ResizeOutcome, ResizeError> {
        let key = request.cache_key();

        if self.variants.exists(&key).await {
            info!(key = %key, "Disk cache hit");
            return Ok(ResizeOutcome {
                key,
                source: VariantSource::Disk,
                effective_size: None,
            });
        }

        let original = self.original(&request.source_url).await?;

        let requested = (request.width, request.height);
        let native = (original.width(), original.height());
        let (width, height) = resolve_dimensions(requested, native);
        if (width, height) != requested {
            info!(
                key = %key,
                original = %format!("{}x{}", native.0, native.1),
                requested = %format!("{}x{}", requested.0, requested.1),
                effective = %format!("{}x{}", width, height),
                "Adjusted dimensions"
            );
        }

        let codec = Arc::clone(&self.codec);
        let format = request.format;
        let encoded = tokio::task::spawn_blocking(move || {
            let resized = codec.resize(&original, width, height, RESIZE_FILTER);
            codec.encode(&resized, format, format.quality())
        })
        .await
        .unwrap_or_else(|e| Err(CodecError::Encode(e.to_string())))
        .map_err(|e| ResizeError::Encode {
            key: key.to_string(),
            message: e.to_string(),
        })?;

        self.variants.write(&key, &encoded).await?;
        info!(key = %key, size = encoded.len(), "Variant generated");

        Ok(ResizeOutcome {
            key,
            source: VariantSource::Pipeline,
            effective_size: Some((width, height)),
        })
    }

    /// Decoded original for `url`, from memory or freshly fetched.
    ///
    /// The memory cache lock is only held for the lookup and the insert.
    async fn original(&self, url: &str) -> Result<Arc<DynamicImage>, ResizeError> {
        if let Some(image) = self.originals.lookup(url).await {
            info!(url = %url, "Memory original image cache hit");
            return Ok(image);
        }

        info!(url = %url, "Downloading");
        let bytes = self
            .fetcher
            .fetch(url)
            .await
            .map_err(|source| ResizeError::Fetch {
                url: url.to_string(),
                source,
            })?;

        let codec = Arc::clone(&self.codec);
        let image = tokio::task::spawn_blocking(move || codec.decode(&bytes))
            .await
            .unwrap_or_else(|e| Err(CodecError::Decode(e.to_string())))
            .map_err(|e| ResizeError::Decode {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        debug!(url = %url, width = image.width(), height = image.height(), "Decoded original");

        let image = Arc::new(image);
        self.originals.insert(url, Arc::clone(&image)).await;
        Ok(image)
    }

    /// The decoded-original cache.
    pub fn originals(&self) -> &OriginalCache {
        &self.originals
    }

    /// The persisted variant cache.
    pub fn variants(&self) -> &VariantCache {
        &self.variants
    }
}

// =============================================================================
// Tests
// =============================================================================
