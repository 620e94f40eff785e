//! In-memory cache of decoded source images.
//!
//! Decoding is the expensive part of serving a new variant of an image
//! that was already seen, so the last few decoded originals are kept in a
//! fixed-capacity LRU keyed by source URL.
//!
//! # Locking
//!
//! The LRU sits behind a single mutex. A lookup and an insert are each one
//! critical section; the fetch and decode between them run without the
//! lock held, so two requests missing on the same URL both do the work and
//! the second insert simply refreshes the entry.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use image::DynamicImage;
use lru::LruCache;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

/// Default number of decoded originals kept in memory.
pub const DEFAULT_ORIGINAL_CACHE_CAPACITY: usize = 10;

/// Point-in-time counters for the original cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OriginalCacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Bounded, recency-ordered cache of decoded source images.
pub struct OriginalCache {
    cache: Mutex<LruCache<String, Arc<DynamicImage>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl OriginalCache {
    /// Create a cache holding [`DEFAULT_ORIGINAL_CACHE_CAPACITY`] images.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ORIGINAL_CACHE_CAPACITY)
    }

    /// Create a cache holding at most `capacity` images (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a decoded image, marking it most recently used on a hit.
    pub async fn lookup(&self, url: &str) -> Option<Arc<DynamicImage>> {
        let found = self.cache.lock().await.get(url).cloned();

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Insert a decoded image as most recently used.
    ///
    /// At capacity the least recently used entry is evicted first. An
    /// existing entry for `url` is replaced in place, never duplicated.
    pub async fn insert(&self, url: impl Into<String>, image: Arc<DynamicImage>) {
        let url = url.into();
        let mut cache = self.cache.lock().await;

        if let Some((evicted, _)) = cache.push(url.clone(), image) {
            if evicted != url {
                debug!(url = %evicted, "Evicted original from memory cache");
            }
        }
    }

    /// Check membership without touching recency.
    pub async fn contains(&self, url: &str) -> bool {
        self.cache.lock().await.contains(url)
    }

    /// Number of cached originals.
    pub async fn len(&self) -> usize {
        self.cache.lock().await.len()
    }

    /// Whether the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.cache.lock().await.is_empty()
    }

    /// Maximum number of cached originals.
    pub async fn capacity(&self) -> usize {
        self.cache.lock().await.cap().get()
    }

    /// Cached URLs from most to least recently used.
    pub async fn urls(&self) -> Vec<String> {
        self.cache
            .lock()
            .await
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    pub async fn stats(&self) -> OriginalCacheStats {
        let cache = self.cache.lock().await;
        OriginalCacheStats {
            entries: cache.len(),
            capacity: cache.cap().get(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for OriginalCache {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
