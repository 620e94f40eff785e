//! Request descriptors and cache keys.
//!
//! A [`ResizeRequest`] fully determines the artifact a client wants: the
//! source URL, the output format and the target box. The [`CacheKey`]
//! derived from it names the persisted variant on disk.
//!
//! # Key Layout
//!
//! ```text
//! <sha256-hex(source url)>_<width>x<height>.<extension>
//! ```
//!
//! The key depends only on the request fields, never on the fetched bytes,
//! and contains no random or time component, so artifacts written by one
//! process remain valid hits for every later process.

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};

use crate::error::ResizeError;

/// JPEG quality used for every JPEG variant.
pub const JPEG_QUALITY: u8 = 85;

/// WebP quality requested for every WebP variant.
pub const WEBP_QUALITY: u8 = 80;

// =============================================================================
// Output Format
// =============================================================================

/// Output encodings supported by the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Jpeg,
    Png,
    Webp,
}

impl OutputFormat {
    /// File extension used for persisted variants.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
        }
    }

    /// MIME type sent as `Content-Type`.
    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Webp => "image/webp",
        }
    }

    /// Encoder quality for this format. PNG is lossless and takes none.
    pub fn quality(&self) -> Option<u8> {
        match self {
            OutputFormat::Jpeg => Some(JPEG_QUALITY),
            OutputFormat::Png => None,
            OutputFormat::Webp => Some(WEBP_QUALITY),
        }
    }

    /// Guess the format of a persisted artifact from its file name.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        ext.parse().ok()
    }
}

impl FromStr for OutputFormat {
    type Err = ResizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::Webp),
            _ => Err(ResizeError::UnsupportedFormat {
                format: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

// =============================================================================
// Resize Request
// =============================================================================

/// A validated request for one resized variant.
///
/// Construction through [`ResizeRequest::new`] guarantees positive
/// dimensions; the front end is responsible for URL validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResizeRequest {
    /// Absolute URL of the source image
    pub source_url: String,

    /// Output encoding
    pub format: OutputFormat,

    /// Requested width in pixels (> 0)
    pub width: u32,

    /// Requested height in pixels (> 0)
    pub height: u32,
}

impl ResizeRequest {
    /// Create a request, rejecting zero dimensions.
    pub fn new(
        source_url: impl Into<String>,
        format: OutputFormat,
        width: u32,
        height: u32,
    ) -> Result<Self, ResizeError> {
        if width == 0 || height == 0 {
            return Err(ResizeError::InvalidRequest {
                reason: format!("dimensions must be positive, got {}x{}", width, height),
            });
        }

        Ok(Self {
            source_url: source_url.into(),
            format,
            width,
            height,
        })
    }

    /// Derive the cache key naming this request's artifact.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::derive(self)
    }
}

// =============================================================================
// Cache Key
// =============================================================================

/// Deterministic name of a persisted variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a request.
    pub fn derive(request: &ResizeRequest) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(request.source_url.as_bytes());
        let url_hash = hex::encode(hasher.finalize());

        CacheKey(format!(
            "{}_{}x{}.{}",
            url_hash,
            request.width,
            request.height,
            request.format.extension()
        ))
    }

    /// The key as a file name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Tests
// =============================================================================
