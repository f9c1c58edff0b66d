//! In-memory result cache keyed by run fingerprint.
//!
//! The cache is the only shared mutable state in a comparison. It is owned by
//! the caller and passed in explicitly; entries are handed out as
//! `Arc<BacktestResult>` so a hit never copies the series.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use stratdash_core::{BacktestResult, Fingerprint};

/// Expiry and capacity rules for a [`ResultCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Entries older than this are treated as absent. `None` never expires.
    pub ttl: Option<Duration>,
    /// Inserting past this evicts the oldest entry.
    pub max_entries: usize,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: None,
            max_entries: 256,
        }
    }
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

struct Entry {
    result: Arc<BacktestResult>,
    inserted: Instant,
    seq: u64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<Fingerprint, Entry>,
    next_seq: u64,
    hits: u64,
    misses: u64,
}

/// Thread-safe memo of backtest results.
pub struct ResultCache {
    policy: CachePolicy,
    inner: Mutex<Inner>,
}

impl ResultCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    // A panic while holding the lock cannot leave the map half-updated.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, entry: &Entry, now: Instant) -> bool {
        self.policy
            .ttl
            .is_some_and(|ttl| now.saturating_duration_since(entry.inserted) >= ttl)
    }

    pub fn get(&self, key: &Fingerprint) -> Option<Arc<BacktestResult>> {
        self.get_at(key, Instant::now())
    }

    /// Look up `key` as of `now`. Expired entries are dropped.
    pub fn get_at(&self, key: &Fingerprint, now: Instant) -> Option<Arc<BacktestResult>> {
        let mut inner = self.lock();
        let found = inner
            .entries
            .get(key)
            .map(|entry| (Arc::clone(&entry.result), self.is_expired(entry, now)));
        match found {
            Some((result, false)) => {
                inner.hits += 1;
                debug!(fingerprint = key.short(), "cache hit");
                Some(result)
            }
            Some((_, true)) => {
                inner.entries.remove(key);
                inner.misses += 1;
                None
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    pub fn insert(&self, key: Fingerprint, result: Arc<BacktestResult>) {
        self.insert_at(key, result, Instant::now());
    }

    /// Store `result` as of `now`, evicting the oldest entries past capacity.
    pub fn insert_at(&self, key: Fingerprint, result: Arc<BacktestResult>, now: Instant) {
        let mut inner = self.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(
            key,
            Entry {
                result,
                inserted: now,
                seq,
            },
        );

        let capacity = self.policy.max_entries.max(1);
        while inner.entries.len() > capacity {
            let Some(oldest) = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.seq)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            inner.entries.remove(&oldest);
            debug!(fingerprint = oldest.short(), "cache eviction");
        }
    }

    /// Return the cached result for `key`, or compute and store it.
    ///
    /// `compute` runs without the lock held, so concurrent misses on the
    /// same key may both compute; the later insert wins. The flag is true on
    /// a hit.
    pub fn get_or_compute<E, F>(
        &self,
        key: &Fingerprint,
        compute: F,
    ) -> Result<(Arc<BacktestResult>, bool), E>
    where
        F: FnOnce() -> Result<BacktestResult, E>,
    {
        if let Some(hit) = self.get(key) {
            return Ok((hit, true));
        }
        let result = Arc::new(compute()?);
        self.insert(key.clone(), Arc::clone(&result));
        Ok((result, false))
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            entries: inner.entries.len(),
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(CachePolicy::default())
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("policy", &self.policy)
            .field("stats", &self.stats())
            .finish()
    }
}
