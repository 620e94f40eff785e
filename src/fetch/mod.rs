//! Retrieval of source images.
//!
//! The resize pipeline reads source bytes through the [`Fetcher`] trait.
//! [`HttpFetcher`] is the production implementation; tests substitute
//! in-memory or panicking fetchers.

mod http_fetcher;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FetchError;

pub use http_fetcher::{HttpFetcher, DEFAULT_FETCH_TIMEOUT_SECS};

/// Trait for retrieving the raw bytes behind a source URL.
///
/// Implementations must be thread-safe: one fetcher is shared by every
/// in-flight request.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the complete body at `url`.
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}
