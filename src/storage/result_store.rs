//! Size-bounded, expiring cache of page results

use crate::config::CacheConfig;
use crate::crawler::PageResult;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

struct CachedResult {
    result: PageResult,
    stored_at: Instant,
}

/// LRU cache of [`PageResult`]s keyed by normalized URL
///
/// Entries older than the TTL are treated as misses and dropped when
/// touched. The store outlives individual crawl runs, so a second run on
/// the same orchestrator reuses results instead of re-driving pages.
pub struct ResultStore {
    entries: Mutex<LruCache<String, CachedResult>>,
    ttl: Duration,
}

impl ResultStore {
    pub fn new(max: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(max)),
            ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        let max = NonZeroUsize::new(config.max).unwrap_or(NonZeroUsize::MIN);
        Self::new(max, config.ttl())
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, CachedResult>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<PageResult> {
        let mut entries = self.lock();

        let expired = match entries.get(key) {
            Some(cached) if cached.stored_at.elapsed() < self.ttl => {
                return Some(cached.result.clone())
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(key);
        }
        None
    }

    pub fn set(&self, key: &str, result: PageResult) {
        self.lock().put(
            key.to_string(),
            CachedResult {
                result,
                stored_at: Instant::now(),
            },
        );
    }

    /// All live entries, most recently used first
    pub fn entries(&self) -> Vec<(String, PageResult)> {
        self.lock()
            .iter()
            .filter(|(_, cached)| cached.stored_at.elapsed() < self.ttl)
            .map(|(key, cached)| (key.clone(), cached.result.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
