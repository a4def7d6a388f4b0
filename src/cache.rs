//! Bounded LRU memo of compiled paths.
//!
//! Compiling is pure, so a cache miss compiles outside the lock. When two
//! threads race on the same path, the entry stored first wins and both callers
//! get it.

use std::{
    num::NonZeroUsize,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use log::{debug, trace};
use lru::LruCache;
use parking_lot::Mutex;

use crate::path::CompiledPath;

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of compiled paths kept; zero is treated as one
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

/// Hit and miss counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Calculate hit ratio as percentage
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Thread-safe LRU cache of compiled paths keyed by source text.
pub struct PathCache {
    entries: Mutex<LruCache<String, Arc<CompiledPath>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PathCache {
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        PathCache {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the entry for `key`, compiling it with `compile` on a miss.
    ///
    /// Compilation errors are returned and nothing is stored.
    pub fn get_or_insert_with<E>(
        &self,
        key: &str,
        compile: impl FnOnce() -> Result<CompiledPath, E>,
    ) -> Result<Arc<CompiledPath>, E> {
        if let Some(found) = self.entries.lock().get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!("path cache hit for {key:?}");
            return Ok(Arc::clone(found));
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let compiled = Arc::new(compile()?);

        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(key) {
            return Ok(Arc::clone(existing));
        }
        if let Some((evicted, _)) = entries.push(key.to_string(), Arc::clone(&compiled)) {
            debug!("path cache evicted {evicted:?}");
        }
        Ok(compiled)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for PathCache {
    fn default() -> Self {
        PathCache::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyntaxError;

    fn compile(path: &str) -> Result<CompiledPath, SyntaxError> {
        CompiledPath::compile(path)
    }

    #[test]
    fn test_hit_returns_same_instance() {
        let cache = PathCache::default();
        let first = cache.get_or_insert_with("$.a", || compile("$.a")).unwrap();
        let second = cache.get_or_insert_with("$.a", || compile("$.a")).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
        assert_eq!(cache.stats().hit_ratio(), 50.0);
    }

    #[test]
    fn test_hit_ratio_of_unused_cache_is_zero() {
        let cache = PathCache::default();
        assert_eq!(cache.stats().hit_ratio(), 0.0);

        cache.get_or_insert_with("$.a", || compile("$.a")).unwrap();
        for _ in 0..3 {
            cache.get_or_insert_with("$.a", || compile("$.a")).unwrap();
        }
        assert_eq!(cache.stats().hit_ratio(), 75.0);
    }

    #[test]
    fn test_racing_misses_share_the_first_stored_entry() {
        let cache = PathCache::default();
        let both_missed = std::sync::Barrier::new(2);
        let lookup = || {
            cache
                .get_or_insert_with("$.a", || {
                    both_missed.wait();
                    compile("$.a")
                })
                .unwrap()
        };

        let (first, second) = std::thread::scope(|scope| {
            let a = scope.spawn(&lookup);
            let b = scope.spawn(&lookup);
            (a.join().unwrap(), b.join().unwrap())
        });

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats(), CacheStats { hits: 0, misses: 2 });
    }

    #[test]
    fn test_clear_forces_recompilation() {
        let cache = PathCache::default();
        let first = cache.get_or_insert_with("$.a", || compile("$.a")).unwrap();
        cache.clear();
        assert!(cache.is_empty());

        let second = cache.get_or_insert_with("$.a", || compile("$.a")).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_least_recently_used_is_evicted() {
        let cache = PathCache::new(CacheConfig { capacity: 2 });
        cache.get_or_insert_with("$.a", || compile("$.a")).unwrap();
        cache.get_or_insert_with("$.b", || compile("$.b")).unwrap();
        // touch $.a so $.b becomes the eviction candidate
        cache.get_or_insert_with("$.a", || compile("$.a")).unwrap();
        cache.get_or_insert_with("$.c", || compile("$.c")).unwrap();

        assert_eq!(cache.len(), 2);
        let mut recompiled = false;
        cache
            .get_or_insert_with("$.b", || {
                recompiled = true;
                compile("$.b")
            })
            .unwrap();
        assert!(recompiled);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache = PathCache::default();
        assert!(cache.get_or_insert_with("$.", || compile("$.")).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_holds_one_entry() {
        let cache = PathCache::new(CacheConfig { capacity: 0 });
        cache.get_or_insert_with("$.a", || compile("$.a")).unwrap();
        cache.get_or_insert_with("$.b", || compile("$.b")).unwrap();
        assert_eq!(cache.len(), 1);
    }
}
