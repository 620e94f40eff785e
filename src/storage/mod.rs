//! Durable storage for encoded variants.

mod variant_cache;

pub use variant_cache::{sanitize_filename, VariantCache, DEFAULT_CACHE_DIR};
