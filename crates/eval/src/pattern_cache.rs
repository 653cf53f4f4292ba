//! Bounded least-recently-used cache of compiled regular expressions.
//!
//! One cache belongs to one matcher. Storage and eviction are moka's; a
//! pattern that fails to compile is returned as an error and never stored.
//! Concurrent misses on the same pattern share a single compilation.

use std::sync::atomic::{AtomicU64, Ordering};

use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use regex::Regex;

use crate::config::DEFAULT_PATTERN_CACHE_CAPACITY;

#[derive(Debug)]
pub struct PatternCache {
    capacity: usize,
    cache: Cache<String, Regex>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for PatternCache {
    fn default() -> Self {
        PatternCache::new(DEFAULT_PATTERN_CACHE_CAPACITY)
    }
}

impl PatternCache {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let cache = Cache::builder()
            .max_capacity(capacity as u64)
            .eviction_policy(EvictionPolicy::lru())
            .build();
        PatternCache {
            capacity,
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Return the compiled pattern, compiling and caching it on a miss.
    pub fn get_or_compile(&self, pattern: &str) -> Result<Regex, regex::Error> {
        if let Some(regex) = self.cache.get(pattern) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(regex);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.cache
            .try_get_with_by_ref(pattern, || Regex::new(pattern))
            .map_err(|err| (*err).clone())
    }

    pub fn contains(&self, pattern: &str) -> bool {
        self.cache.contains_key(pattern)
    }

    /// Settles pending evictions before counting.
    pub fn len(&self) -> usize {
        self.cache.run_pending_tasks();
        self.cache.entry_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_compiled_patterns() {
        let cache = PatternCache::new(4);
        assert!(cache.get_or_compile("^a+$").unwrap().is_match("aaa"));
        assert!(cache.get_or_compile("^a+$").is_ok());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = PatternCache::new(2);
        cache.get_or_compile("a").unwrap();
        cache.get_or_compile("b").unwrap();
        assert_eq!(cache.len(), 2);
        // Touch "a" so "b" becomes the eviction candidate.
        cache.get_or_compile("a").unwrap();
        assert_eq!(cache.len(), 2);
        cache.get_or_compile("c").unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn invalid_patterns_are_errors_and_not_cached() {
        let cache = PatternCache::new(2);
        assert!(cache.get_or_compile("(unclosed").is_err());
        assert!(cache.get_or_compile("(unclosed").is_err());
        assert!(cache.is_empty());
        assert_eq!(cache.misses(), 2);
    }

    #[test]
    fn zero_capacity_still_holds_one_entry() {
        let cache = PatternCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.get_or_compile("x").unwrap();
        assert_eq!(cache.len(), 1);
        cache.get_or_compile("y").unwrap();
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("y"));
    }

    #[test]
    fn default_capacity_is_one_hundred() {
        let cache = PatternCache::default();
        assert_eq!(cache.capacity(), 100);
        for i in 0..150 {
            cache.get_or_compile(&format!("p{}", i)).unwrap();
        }
        assert_eq!(cache.len(), 100);
        assert!(!cache.contains("p0"));
        assert!(cache.contains("p149"));
    }

    #[test]
    fn shared_across_threads() {
        let cache = std::sync::Arc::new(PatternCache::new(8));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = std::sync::Arc::clone(&cache);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        let re = cache.get_or_compile(&format!("^t{}$", i % 4)).unwrap();
                        assert!(re.is_match(&format!("t{}", i % 4)));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 4);
    }
}
