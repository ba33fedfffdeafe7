/// Generic reference-counted resource cache
///
/// At most one live payload exists per key. Every successful `acquire_with`
/// must be paired with exactly one `release`; the payload is dropped (and its
/// GPU object destroyed) when the count reaches zero.
///
/// Single-threaded: every mutator takes `&mut self`. Callers that share a
/// cache across threads must wrap it themselves.

use std::sync::Arc;
use rustc_hash::FxHashMap;
use crate::error::Result;
use crate::cache::ResourceKey;
use crate::{engine_debug, engine_trace, engine_warn};

/// Cache entry
struct CachedResource<T: ?Sized> {
    ref_count: u32,
    key: ResourceKey,
    payload: Arc<T>,
}

/// Counted reference to a cached payload
///
/// Not `Clone`: a second reference must come from a second acquire, so the
/// count always matches the number of live handles.
pub struct CacheHandle<T: ?Sized> {
    key: ResourceKey,
    payload: Arc<T>,
}

impl<T: ?Sized> CacheHandle<T> {
    pub fn key(&self) -> ResourceKey {
        self.key
    }

    pub fn get(&self) -> &Arc<T> {
        &self.payload
    }
}

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Live entries
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Reference-counted cache keyed by `ResourceKey`
pub struct ResourceCache<T: ?Sized> {
    name: &'static str,
    entries: FxHashMap<ResourceKey, CachedResource<T>>,
    hits: u64,
    misses: u64,
}

impl<T: ?Sized> ResourceCache<T> {
    /// Create an empty cache; `name` tags its log lines
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: FxHashMap::default(),
            hits: 0,
            misses: 0,
        }
    }

    /// Return the payload for `key`, creating it with `create` on a miss
    ///
    /// A failed `create` inserts nothing and leaves the cache unchanged.
    pub fn acquire_with<F>(&mut self, key: ResourceKey, create: F) -> Result<CacheHandle<T>>
    where
        F: FnOnce() -> Result<Arc<T>>,
    {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.ref_count += 1;
            self.hits += 1;
            engine_trace!("prism::ResourceCache", "{} hit {} (refs {})", self.name, key, entry.ref_count);
            return Ok(CacheHandle { key, payload: entry.payload.clone() });
        }

        let payload = create()?;
        self.misses += 1;
        engine_debug!("prism::ResourceCache", "{} created {}", self.name, key);
        self.entries.insert(key, CachedResource {
            ref_count: 1,
            key,
            payload: payload.clone(),
        });
        Ok(CacheHandle { key, payload })
    }

    /// Give back one reference; returns true when the payload was destroyed
    pub fn release(&mut self, handle: CacheHandle<T>) -> bool {
        let key = handle.key;
        drop(handle);

        let Some(entry) = self.entries.get_mut(&key) else {
            debug_assert!(false, "{}: released a handle the cache does not own ({})", self.name, key);
            engine_warn!("prism::ResourceCache", "{} release of unknown key {}", self.name, key);
            return false;
        };

        entry.ref_count -= 1;
        if entry.ref_count > 0 {
            engine_trace!("prism::ResourceCache", "{} release {} (refs {})", self.name, key, entry.ref_count);
            return false;
        }

        if let Some(entry) = self.entries.remove(&key) {
            engine_debug!("prism::ResourceCache", "{} destroyed {}", self.name, entry.key);
        }
        true
    }

    /// Current reference count (0 when absent)
    pub fn ref_count(&self, key: ResourceKey) -> u32 {
        self.entries.get(&key).map_or(0, |entry| entry.ref_count)
    }

    pub fn contains(&self, key: ResourceKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }

    /// Drop every entry regardless of its count (teardown)
    pub fn clear(&mut self) {
        let leaked: u32 = self.entries.values().map(|entry| entry.ref_count).sum();
        if leaked > 0 {
            engine_warn!("prism::ResourceCache", "{} cleared with {} outstanding references", self.name, leaked);
        }
        self.entries.clear();
    }
}

#[cfg(test)]
#[path = "resource_cache_tests.rs"]
mod tests;
