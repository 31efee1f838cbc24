//! Bounded cache of successful translations for the lifetime of a run.
//! Failures are never stored, so a failed unit is always re-requested.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use super::LanguageTag;

/// blake3 digest of `src | tgt | text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    pub fn new(source: &LanguageTag, target: &LanguageTag, text: &str) -> Self {
        let digest = blake3::Hasher::new()
            .update(source.as_str().as_bytes())
            .update(b"|")
            .update(target.as_str().as_bytes())
            .update(b"|")
            .update(text.as_bytes())
            .finalize();
        Self(*digest.as_bytes())
    }
}

struct Cached {
    text: String,
    /// None when the TTL is too large to represent.
    expires_at: Option<Instant>,
}

impl Cached {
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |deadline| now < deadline)
    }
}

pub struct TranslationCache {
    entries: Mutex<LruCache<CacheKey, Cached>>,
    ttl: Duration,
}

impl TranslationCache {
    /// None for a zero capacity: caching is off.
    pub fn new(capacity: usize, ttl: Duration) -> Option<Self> {
        NonZeroUsize::new(capacity).map(|capacity| Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        })
    }

    /// Fresh translation for `key`. Expired entries are evicted on the way.
    pub fn lookup(&self, key: &CacheKey) -> Option<String> {
        let mut entries = self.entries.lock();
        let fresh = entries
            .get(key)
            .filter(|cached| cached.is_fresh(Instant::now()))
            .map(|cached| cached.text.clone());
        if fresh.is_none() {
            entries.pop(key);
        }
        fresh
    }

    pub fn store(&self, key: CacheKey, text: String) {
        let expires_at = Instant::now().checked_add(self.ttl);
        self.entries.lock().put(key, Cached { text, expires_at });
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
