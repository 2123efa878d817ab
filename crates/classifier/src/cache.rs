//! Content-addressed result cache.
//!
//! Completed classification results are stored under a fingerprint of the
//! ticket content, so a retried or duplicated ticket is answered without a
//! provider round trip. Entries expire by TTL, checked lazily on read, and
//! the cache is bounded: when full it drops expired entries first and then
//! the oldest-written entries until it is back at half capacity.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use sha2::{Digest, Sha256};

use triage_core::config::CacheConfig;
use triage_core::ClassificationResult;

struct CacheEntry {
    result: ClassificationResult,
    written_at: Instant,
}

/// Counters exposed for observability.
#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
}

pub struct ResultCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    max_size: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    pub fn new(cfg: &CacheConfig) -> Self {
        Self::with_ttl(Duration::from_secs(cfg.ttl_minutes * 60), cfg.max_size)
    }

    /// Explicit TTL constructor, used by tests with short expirations.
    pub fn with_ttl(ttl: Duration, max_size: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_size: max_size.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Fingerprint of the ticket content: first 32 hex characters of the
    /// SHA-256 of `ticket_id|subject|body`, absent fields as empty strings.
    pub fn fingerprint(ticket_id: Option<&str>, subject: &str, body: Option<&str>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(ticket_id.unwrap_or_default().as_bytes());
        hasher.update(b"|");
        hasher.update(subject.as_bytes());
        hasher.update(b"|");
        hasher.update(body.unwrap_or_default().as_bytes());
        let digest = hasher.finalize();

        let mut hex = String::with_capacity(32);
        for byte in digest.iter().take(16) {
            hex.push_str(&format!("{:02x}", byte));
        }
        hex
    }

    /// Look up a cached result. Expired entries are removed on sight.
    pub fn get(&self, fingerprint: &str) -> Option<ClassificationResult> {
        let expired = match self.entries.get(fingerprint) {
            Some(entry) => {
                if entry.written_at.elapsed() < self.ttl {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(fingerprint, "cache hit");
                    return Some(entry.result.clone());
                }
                true
            }
            None => false,
        };

        if expired {
            self.entries.remove(fingerprint);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a completed result, evicting as needed to stay within bounds.
    pub fn put(&self, fingerprint: impl Into<String>, result: ClassificationResult) {
        if self.entries.len() >= self.max_size {
            self.evict();
        }
        self.entries.insert(
            fingerprint.into(),
            CacheEntry {
                result,
                written_at: Instant::now(),
            },
        );
    }

    /// Drop expired entries; if the cache is still at capacity afterwards,
    /// drop the oldest-written entries until half the capacity is free.
    fn evict(&self) {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.written_at.elapsed() < self.ttl);

        if self.entries.len() >= self.max_size {
            let target = self.max_size / 2;
            let mut by_age: Vec<(String, Instant)> = self
                .entries
                .iter()
                .map(|e| (e.key().clone(), e.value().written_at))
                .collect();
            by_age.sort_by_key(|(_, written_at)| *written_at);

            for (key, _) in by_age {
                if self.entries.len() <= target {
                    break;
                }
                self.entries.remove(&key);
            }
        }

        tracing::debug!(before, after = self.entries.len(), "cache eviction pass");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
