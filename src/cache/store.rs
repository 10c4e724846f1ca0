//! The cache store boundary (§4.5: `exists?(key)`, `load(key)`, `save(key,
//! bytes)`, `clear()`) and a filesystem-backed implementation rooted at the
//! platform cache directory (§6.3), grounded on `tinymist-world/src/
//! https.rs`'s `dirs::cache_dir()` usage for its own on-disk package cache.

use std::fs;
use std::path::PathBuf;

use crate::error::CoreError;

/// `{cache_root}/{subpath}` (§6.3: "a fixed subpath"). `dytype` is this
/// engine's own namespace under the user's cache directory, mirroring
/// `tinymist-world`'s `typst/packages` subpath convention for its own
/// on-disk package cache.
const CACHE_SUBPATH: &str = "dytype/signatures";

/// The declared-signature cache's storage boundary (§4.5). The core only
/// ever depends on this trait, never a concrete filesystem/network backend.
pub trait CacheStore {
    fn exists(&self, key: &str) -> bool;
    fn load(&self, key: &str) -> Result<Vec<u8>, CoreError>;
    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), CoreError>;
    fn clear(&self) -> Result<(), CoreError>;
}

/// A filesystem-backed cache store rooted at `$cache_dir/dytype/signatures`
/// (environment-overridable per-platform via `dirs::cache_dir`, §6.3), with
/// one JSON file per library (§6.1).
pub struct FsCacheStore {
    root: PathBuf,
}

impl FsCacheStore {
    /// Uses the platform cache directory, falling back to `./.cache` when
    /// none is available (e.g. a sandboxed or headless environment with no
    /// `$HOME`) rather than failing to construct at all.
    pub fn new() -> Self {
        let base = dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".cache"));
        Self { root: base.join(CACHE_SUBPATH) }
    }

    pub fn at(root: PathBuf) -> Self {
        Self { root }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl Default for FsCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore for FsCacheStore {
    fn exists(&self, key: &str) -> bool {
        self.path_for(key).exists()
    }

    fn load(&self, key: &str) -> Result<Vec<u8>, CoreError> {
        fs::read(self.path_for(key)).map_err(|source| CoreError::CacheIo { key: key.to_string(), source })
    }

    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), CoreError> {
        if let Some(parent) = self.path_for(key).parent() {
            fs::create_dir_all(parent)
                .map_err(|source| CoreError::CacheIo { key: key.to_string(), source })?;
        }
        fs::write(self.path_for(key), bytes)
            .map_err(|source| CoreError::CacheIo { key: key.to_string(), source })
    }

    fn clear(&self) -> Result<(), CoreError> {
        if !self.root.exists() {
            return Ok(());
        }
        fs::remove_dir_all(&self.root)
            .map_err(|source| CoreError::CacheIo { key: "*".to_string(), source })
    }
}

/// An in-memory store for tests and embedded use, keyed exactly like the
/// filesystem store.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: parking_lot::RwLock<rustc_hash::FxHashMap<String, Vec<u8>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCacheStore {
    fn exists(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    fn load(&self, key: &str) -> Result<Vec<u8>, CoreError> {
        self.entries.read().get(key).cloned().ok_or_else(|| CoreError::CacheIo {
            key: key.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such cache entry"),
        })
    }

    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), CoreError> {
        self.entries.write().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        self.entries.write().clear();
        Ok(())
    }
}
