//! # Response Cache
//!
//! TTL cache for GitHub API responses with pluggable storage backends.
//!
//! Every cached value is stored as JSON together with the time it was
//! written; reads past the TTL behave exactly like misses. The in-memory
//! backend bounds itself by entry count, the file backend by total
//! serialized size.

use std::collections::HashMap;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Minutes a cached response stays fresh.
const CACHE_TTL_MINUTES: i64 = 30;

/// Per-entry size cap; larger payloads are simply not cached.
const MAX_VALUE_BYTES: usize = 500 * 1024;

/// Entry count bound for the in-memory backend.
const MEMORY_CAPACITY: usize = 512;

/// Total serialized size bound for the file backend.
const FILE_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Error raised by a cache storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend is out of room for the entry
    #[error("cache storage quota exceeded")]
    QuotaExceeded,
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A cached value and the unix timestamp it was written at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Write time, seconds since the unix epoch
    pub at: i64,
    pub data: serde_json::Value,
}

/// Storage backend for [`ResponseCache`].
///
/// `get` takes `&mut self` so recency-tracking backends can reorder on
/// read.
pub trait Store: Send {
    fn get(&mut self, key: &str) -> Option<CacheEntry>;
    fn set(&mut self, key: &str, entry: CacheEntry) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str);
    fn keys(&self) -> Vec<String>;
    fn clear(&mut self);
}

/// Shared TTL cache over an arbitrary [`Store`].
///
/// Clones share the same backend, so one cache can serve the API client
/// and the collection pipeline at the same time.
#[derive(Clone)]
pub struct ResponseCache {
    inner: Arc<Mutex<Box<dyn Store>>>,
    ttl: Duration,
}

impl ResponseCache {
    /// Creates a cache over the given backend with the standard TTL.
    pub fn new(store: Box<dyn Store>) -> Self {
        Self::with_ttl(store, Duration::minutes(CACHE_TTL_MINUTES))
    }

    /// Creates a cache with an explicit TTL.
    pub fn with_ttl(store: Box<dyn Store>, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
            ttl,
        }
    }

    /// Creates a cache backed by the bounded in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    /// Returns the cached value for `key` if present, fresh and decodable.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let now = Utc::now().timestamp();
        let mut store = self.inner.lock().ok()?;
        let entry = store.get(key)?;
        if now - entry.at >= self.ttl.num_seconds() {
            store.remove(key);
            return None;
        }
        match serde_json::from_value(entry.data) {
            Ok(value) => Some(value),
            Err(err) => {
                log::debug!("cache: discarding undecodable entry {key}: {err}");
                store.remove(key);
                None
            }
        }
    }

    /// Caches `value` under `key`.
    ///
    /// Failures never surface to the caller: oversized values are skipped,
    /// and a full backend is recovered by purging expired entries, then by
    /// clearing outright.
    pub fn store<T: Serialize>(&self, key: &str, value: &T) {
        let data = match serde_json::to_value(value) {
            Ok(data) => data,
            Err(err) => {
                log::warn!("cache: failed to encode {key}: {err}");
                return;
            }
        };
        let size = data.to_string().len();
        if size > MAX_VALUE_BYTES {
            log::debug!("cache: skipping {key}, {size} bytes exceeds the per-entry cap");
            return;
        }
        let entry = CacheEntry {
            at: Utc::now().timestamp(),
            data,
        };
        let Ok(mut store) = self.inner.lock() else {
            return;
        };
        match store.set(key, entry.clone()) {
            Ok(()) => {}
            Err(StoreError::QuotaExceeded) => {
                purge_expired(store.as_mut(), self.ttl);
                let retried = match store.set(key, entry.clone()) {
                    Err(StoreError::QuotaExceeded) => {
                        store.clear();
                        store.set(key, entry)
                    }
                    other => other,
                };
                if let Err(err) = retried {
                    log::warn!("cache: dropping {key}: {err}");
                }
            }
            Err(err) => log::warn!("cache: dropping {key}: {err}"),
        }
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        if let Ok(mut store) = self.inner.lock() {
            store.clear();
        }
    }

    /// Drops entries past the TTL, keeping the rest.
    pub fn clear_expired(&self) {
        if let Ok(mut store) = self.inner.lock() {
            purge_expired(store.as_mut(), self.ttl);
        }
    }
}

/// Removes expired entries from a backend the caller already holds.
fn purge_expired(store: &mut dyn Store, ttl: Duration) {
    let now = Utc::now().timestamp();
    let mut stale = Vec::new();
    for key in store.keys() {
        if let Some(entry) = store.get(&key) {
            if now - entry.at >= ttl.num_seconds() {
                stale.push(key);
            }
        }
    }
    for key in &stale {
        store.remove(key);
    }
}

/// In-memory backend bounded by entry count with LRU eviction.
pub struct MemoryStore {
    entries: LruCache<String, CacheEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_capacity(MEMORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn get(&mut self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, entry: CacheEntry) -> Result<(), StoreError> {
        self.entries.put(key.to_string(), entry);
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        self.entries.pop(key);
    }

    fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(key, _)| key.clone()).collect()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// File-backed backend holding all entries in one JSON document.
///
/// The whole document is rewritten on every set, which is fine at the
/// request volumes a dashboard run produces. Writes that would push the
/// document past the quota are rolled back and reported as
/// [`StoreError::QuotaExceeded`].
pub struct FileStore {
    path: PathBuf,
    entries: HashMap<String, CacheEntry>,
}

impl FileStore {
    /// Opens (or creates) the cache file inside `dir`.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(dir)?;
        let path = dir.join("responses.json");
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                log::warn!("cache: ignoring corrupt cache file {}: {err}", path.display());
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };
        Ok(Self { path, entries })
    }

    /// The platform cache directory for this tool, when one exists.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::cache_dir().map(|dir| dir.join("orgstats"))
    }

    fn persist(&self) -> Result<(), StoreError> {
        let raw = serde_json::to_string(&self.entries)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }

    fn serialized_len(&self) -> usize {
        serde_json::to_string(&self.entries).map_or(0, |raw| raw.len())
    }
}

impl Store for FileStore {
    fn get(&mut self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, entry: CacheEntry) -> Result<(), StoreError> {
        let previous = self.entries.insert(key.to_string(), entry);
        if self.serialized_len() > FILE_QUOTA_BYTES {
            match previous {
                Some(previous) => {
                    self.entries.insert(key.to_string(), previous);
                }
                None => {
                    self.entries.remove(key);
                }
            }
            return Err(StoreError::QuotaExceeded);
        }
        self.persist()
    }

    fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            if let Err(err) = self.persist() {
                log::warn!("cache: failed to persist removal: {err}");
            }
        }
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn clear(&mut self) {
        self.entries.clear();
        if let Err(err) = self.persist() {
            log::warn!("cache: failed to persist clear: {err}");
        }
    }
}

/// Cache key for an organization's repository list.
pub fn repos_key(org: &str) -> String {
    format!("repos:{org}")
}

/// Cache key for a repository's contributor statistics.
pub fn stats_key(org: &str, repo: &str) -> String {
    format!("stats:{org}/{repo}")
}

/// Cache key for a repository's commit listing, split by branch and window
/// start day so differently-windowed queries never collide.
pub fn commits_key(org: &str, repo: &str, branch: &str, since: Option<DateTime<Utc>>) -> String {
    format!("commits:{org}/{repo}:{branch}:{}", since_day(since))
}

/// Cache key for a repository's assembled pull request list.
pub fn pulls_key(org: &str, repo: &str, since: Option<DateTime<Utc>>) -> String {
    format!("prs:{org}/{repo}:{}", since_day(since))
}

/// Cache key for a repository's assembled review map.
pub fn reviews_key(org: &str, repo: &str, since: Option<DateTime<Utc>>) -> String {
    format!("reviews:{org}/{repo}:{}", since_day(since))
}

fn since_day(since: Option<DateTime<Utc>>) -> String {
    since.map_or_else(|| "all".to_string(), |s| s.format("%Y-%m-%d").to_string())
}
