//! Persistent cache of encoded variants.
//!
//! Each variant is a flat file in the cache directory named by its
//! [`CacheKey`]. Files are created once and never updated, expired or
//! deleted: the presence of a file is proof that its resize and encode work
//! is done. Growth is unbounded.
//!
//! # Atomic Writes
//!
//! Writes land in a uniquely named temporary file in the same directory and
//! are renamed into place, so a concurrent reader sees either no file or
//! the complete artifact. Two writers racing on the same key both succeed;
//! the last rename wins and the contents are identical.

use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::ResizeError;
use crate::resize::CacheKey;

/// Default location of the variant cache.
pub const DEFAULT_CACHE_DIR: &str = "./cache";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Directory-backed store of encoded variants.
#[derive(Debug, Clone)]
pub struct VariantCache {
    dir: PathBuf,
}

impl VariantCache {
    /// Create a cache rooted at `dir`. The directory is created lazily on
    /// the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the artifact for `key`.
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.as_str())
    }

    /// Whether an artifact exists for `key`. No content validation.
    ///
    /// Only a regular file counts; a directory at the key path does not.
    pub async fn exists(&self, key: &CacheKey) -> bool {
        let path = self.path_for(key);
        match fs::metadata(&path).await {
            Ok(meta) => meta.is_file(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to stat cached variant");
                false
            }
        }
    }

    /// Persist `data` as the artifact for `key`.
    pub async fn write(&self, key: &CacheKey, data: &[u8]) -> Result<PathBuf, ResizeError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ResizeError::file_system(&self.dir, e))?;

        let path = self.path_for(key);
        let tmp = self.dir.join(format!(
            ".{}.tmp.{}.{}",
            key.as_str(),
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        if let Err(e) = write_file(&tmp, data).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(ResizeError::file_system(&tmp, e));
        }

        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(ResizeError::file_system(&path, e));
        }

        debug!(key = %key, size = data.len(), "Wrote variant to disk cache");
        Ok(path)
    }

    /// Read the artifact for `key`.
    pub async fn read(&self, key: &CacheKey) -> Result<Bytes, ResizeError> {
        self.read_file(key.as_str()).await
    }

    /// Read an artifact by a client-supplied file name.
    ///
    /// The name is reduced to a single path component inside the cache
    /// directory first; anything that cannot be confined is reported as
    /// not found.
    pub async fn read_file(&self, filename: &str) -> Result<Bytes, ResizeError> {
        let not_found = || ResizeError::NotFound {
            filename: filename.to_string(),
        };

        let name = sanitize_filename(filename).ok_or_else(not_found)?;
        let path = self.dir.join(name);

        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(not_found()),
            Err(e) => match fs::metadata(&path).await {
                // A directory or other non-file entry is not an artifact
                Ok(meta) if !meta.is_file() => Err(not_found()),
                _ => Err(ResizeError::file_system(&path, e)),
            },
        }
    }
}

async fn write_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    Ok(())
}

/// Reduce a client-supplied name to a file name confined to one directory.
///
/// The path is normalised lexically (`.` dropped, `..` pops a component,
/// never above the root) and its final component is kept. Returns `None`
/// when nothing nameable remains or when the name would be hidden.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();

    for component in Path::new(raw).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::ParentDir => {
                parts.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    let name = parts.pop()?;
    if name.starts_with('.') {
        return None;
    }
    Some(name.to_string())
}

// =============================================================================
// Tests
// =============================================================================
