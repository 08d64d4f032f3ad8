use lru::LruCache;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::Mutex;

const DEFAULT_CAPACITY: usize = 4096;

/// Key/value store for derived workspace state. Absence and a value that no
/// longer deserializes are both cache-misses; the store never errors on
/// read.
pub trait WorkspaceCache: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value);
    /// Drops every entry whose key starts with `prefix`. Used to invalidate
    /// per-document derived state when the document changes.
    fn remove_prefix(&self, prefix: &str);
}

/// In-memory LRU backend.
pub struct MemoryCache {
    entries: Mutex<LruCache<String, Value>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity is at least one");
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkspaceCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .put(key.to_string(), value);
    }

    fn remove_prefix(&self, prefix: &str) {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        let stale: Vec<String> = entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale {
            entries.pop(&key);
        }
    }
}

/// Backend used when caching is disabled by configuration: every read is a
/// miss, every write is dropped.
pub struct NoopCache;

impl WorkspaceCache for NoopCache {
    fn get(&self, _key: &str) -> Option<Value> {
        None
    }

    fn set(&self, _key: &str, _value: Value) {}

    fn remove_prefix(&self, _prefix: &str) {}
}

/// Typed read: a stored value that no longer matches `T` reads as a miss.
pub fn get_typed<T: serde::de::DeserializeOwned>(
    cache: &dyn WorkspaceCache,
    key: &str,
) -> Option<T> {
    let value = cache.get(key)?;
    match serde_json::from_value(value) {
        Ok(typed) => Some(typed),
        Err(err) => {
            log::warn!("cache entry `{key}` no longer deserializes, treating as miss: {err}");
            None
        }
    }
}

pub fn set_typed<T: serde::Serialize>(cache: &dyn WorkspaceCache, key: &str, value: &T) {
    match serde_json::to_value(value) {
        Ok(value) => cache.set(key, value),
        Err(err) => log::warn!("cache entry `{key}` could not be stored: {err}"),
    }
}
