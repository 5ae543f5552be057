//! Content-addressable response cache.
//!
//! Entries are keyed by a digest of the request URL and its parameters and
//! hold the complete serialized response. An entry is trusted only while its
//! modification time is strictly after the cache epoch, which is fixed once
//! when the cache is constructed.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use engine_logging::{engine_debug, engine_warn};
use sha2::{Digest, Sha256};

use crate::fetch::CachedResponse;
use crate::persist::{AtomicFileWriter, PersistError};
use crate::types::{FailureKind, FetchError};

pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(60 * 60);

/// Hex SHA-256 over the URL followed by every parameter name and value.
///
/// Parameters are sorted by name, then value, before hashing so the key does
/// not depend on the order the caller listed them in.
pub fn cache_key(url: &str, params: &[(&str, &str)]) -> String {
    let mut sorted: Vec<&(&str, &str)> = params.iter().collect();
    sorted.sort();

    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    for (name, value) in sorted {
        hasher.update(name.as_bytes());
        hasher.update(value.as_bytes());
    }
    let digest = hasher.finalize();

    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}

/// Backing storage for serialized responses.
pub trait CacheStore: Send + Sync {
    /// Last modification time of the entry, if it exists.
    fn modified(&self, key: &str) -> Option<SystemTime>;
    fn load(&self, key: &str) -> io::Result<Vec<u8>>;
    fn store(&self, key: &str, blob: &[u8]) -> io::Result<()>;
}

/// One file per key under `<root>/<site-name>/`.
#[derive(Debug, Clone)]
pub struct DiskCacheStore {
    writer: AtomicFileWriter,
}

impl DiskCacheStore {
    pub fn new(root: &Path, site_name: &str) -> Self {
        Self {
            writer: AtomicFileWriter::new(root.join(site_name)),
        }
    }

    pub fn dir(&self) -> &Path {
        self.writer.dir()
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir().join(key)
    }
}

impl CacheStore for DiskCacheStore {
    fn modified(&self, key: &str) -> Option<SystemTime> {
        fs::metadata(self.path_for(key))
            .and_then(|meta| meta.modified())
            .ok()
    }

    fn load(&self, key: &str) -> io::Result<Vec<u8>> {
        fs::read(self.path_for(key))
    }

    fn store(&self, key: &str, blob: &[u8]) -> io::Result<()> {
        match self.writer.write(key, blob) {
            Ok(_) => Ok(()),
            Err(PersistError::Io(err)) => Err(err),
            Err(other) => Err(io::Error::other(other.to_string())),
        }
    }
}

/// In-memory store with explicit modification times, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, (SystemTime, Vec<u8>)>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, blob: Vec<u8>, modified: SystemTime) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), (modified, blob));
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCacheStore {
    fn modified(&self, key: &str) -> Option<SystemTime> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|(modified, _)| *modified)
    }

    fn load(&self, key: &str) -> io::Result<Vec<u8>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|(_, blob)| blob.clone())
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    fn store(&self, key: &str, blob: &[u8]) -> io::Result<()> {
        self.insert(key, blob.to_vec(), SystemTime::now());
        Ok(())
    }
}

/// Where and for how long responses are cached.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub root: PathBuf,
    pub max_age: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            root: dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".cache")),
            max_age: DEFAULT_MAX_AGE,
        }
    }
}

impl CacheSettings {
    /// Opens the on-disk cache for one site.
    pub fn open(&self, site_name: &str) -> KeyedCache {
        KeyedCache::with_max_age(
            Box::new(DiskCacheStore::new(&self.root, site_name)),
            self.max_age,
        )
    }
}

pub struct KeyedCache {
    store: Box<dyn CacheStore>,
    epoch: SystemTime,
}

impl KeyedCache {
    pub fn new(store: Box<dyn CacheStore>) -> Self {
        Self::with_max_age(store, DEFAULT_MAX_AGE)
    }

    pub fn with_max_age(store: Box<dyn CacheStore>, max_age: Duration) -> Self {
        let epoch = SystemTime::now()
            .checked_sub(max_age)
            .unwrap_or(UNIX_EPOCH);
        Self::with_epoch(store, epoch)
    }

    pub fn with_epoch(store: Box<dyn CacheStore>, epoch: SystemTime) -> Self {
        Self { store, epoch }
    }

    /// Entries modified at or before this instant are stale.
    pub fn epoch(&self) -> SystemTime {
        self.epoch
    }

    pub fn is_fresh(&self, modified: SystemTime) -> bool {
        modified > self.epoch
    }

    /// Returns the cached response for `(url, params)` or runs `fetch` and records its result.
    ///
    /// Errors from `fetch` are returned untouched and nothing is stored.
    pub fn get_or_fetch<F>(
        &self,
        url: &str,
        params: &[(&str, &str)],
        fetch: F,
    ) -> Result<CachedResponse, FetchError>
    where
        F: FnOnce() -> Result<CachedResponse, FetchError>,
    {
        let key = cache_key(url, params);

        if let Some(response) = self.lookup(&key) {
            engine_debug!("Cache hit for {} ({})", url, key);
            return Ok(response);
        }

        engine_debug!("Cache miss for {} ({})", url, key);
        let response = fetch()?;
        let blob = response
            .to_blob()
            .map_err(|err| FetchError::new(FailureKind::Cache, err.to_string()))?;
        self.store
            .store(&key, &blob)
            .map_err(|err| FetchError::new(FailureKind::Cache, err.to_string()))?;
        Ok(response)
    }

    fn lookup(&self, key: &str) -> Option<CachedResponse> {
        let modified = self.store.modified(key)?;
        if !self.is_fresh(modified) {
            return None;
        }
        let blob = match self.store.load(key) {
            Ok(blob) => blob,
            Err(err) => {
                engine_warn!("Failed to read cache entry {}: {}", key, err);
                return None;
            }
        };
        match CachedResponse::from_blob(&blob) {
            Ok(response) => Some(response),
            Err(err) => {
                engine_warn!("Discarding undecodable cache entry {}: {}", key, err);
                None
            }
        }
    }
}
