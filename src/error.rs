use thiserror::Error;

/// Errors that can occur when fetching a source image from its origin
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// The origin did not answer within the configured timeout
    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// The origin answered with a non-success status
    #[error("Origin returned HTTP {status}")]
    Status { status: u16 },
}

/// Errors raised by the pixel codec
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    /// Bytes could not be decoded into an image
    #[error("decode failed: {0}")]
    Decode(String),

    /// Image could not be encoded in the requested format
    #[error("encode failed: {0}")]
    Encode(String),
}

/// Errors surfaced by the resize pipeline and its front end.
///
/// Every variant carries enough context (source URL, cache key, path) to
/// diagnose the failure without retrying.
#[derive(Debug, Clone, Error)]
pub enum ResizeError {
    /// Malformed path or parameters (HTTP 400)
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// Requested cache artifact does not exist (HTTP 404)
    #[error("Not found: {filename}")]
    NotFound { filename: String },

    /// Method other than GET (HTTP 405)
    #[error("Method not allowed: {method}")]
    MethodNotAllowed { method: String },

    /// Source image could not be fetched
    #[error("Failed to download {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },

    /// Source bytes are not a readable image
    #[error("Failed to decode image from {url}: {message}")]
    Decode { url: String, message: String },

    /// Output format token is not one of jpg/jpeg, png, webp
    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },

    /// Resized image could not be encoded
    #[error("Failed to encode {key}: {message}")]
    Encode { key: String, message: String },

    /// Cache directory or artifact I/O failure
    #[error("File system error on {path}: {message}")]
    FileSystem { path: String, message: String },
}

impl ResizeError {
    /// Build a file system error from an I/O error and the path involved.
    pub fn file_system(path: impl AsRef<std::path::Path>, err: std::io::Error) -> Self {
        ResizeError::FileSystem {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }
}
