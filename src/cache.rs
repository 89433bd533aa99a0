//! Time-bounded cache of derived tables.
//!
//! Entries are keyed by source identity and granularity and expire lazily on
//! read once older than the TTL. A TTL of zero disables caching.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use crate::derive::{Derivation, derive};
use crate::error::Result;
use crate::record::{Granularity, RawRecord};

/// Identity of a derived table: where the raw rows came from and which
/// granularity they were derived at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceKey {
    pub source: String,
    pub granularity: Granularity,
}

impl SourceKey {
    pub fn new(source: impl Into<String>, granularity: Granularity) -> Self {
        Self {
            source: source.into(),
            granularity,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Arc<Derivation>,
    created_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() >= ttl
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

pub struct DerivedCache {
    ttl: Duration,
    entries: RwLock<HashMap<SourceKey, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl DerivedCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the fresh entry for `key`, evicting it if expired.
    pub fn get(&self, key: &SourceKey) -> Option<Arc<Derivation>> {
        let found = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            entries
                .get(key)
                .map(|entry| (entry.value.clone(), entry.is_expired(self.ttl)))
        };

        match found {
            Some((value, false)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(source = %key.source, granularity = %key.granularity, "Cache hit");
                Some(value)
            }
            Some((_, true)) => {
                self.invalidate(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(source = %key.source, granularity = %key.granularity, "Cache entry expired");
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, key: SourceKey, value: Arc<Derivation>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            key,
            CacheEntry {
                value,
                created_at: Instant::now(),
            },
        );
    }

    /// Returns the cached table for `key`, or loads the raw rows with `load`,
    /// derives them and caches the result. Load failures are not cached.
    pub async fn get_or_derive<F, Fut>(&self, key: SourceKey, load: F) -> Result<Arc<Derivation>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<RawRecord>>>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        let raw = load().await?;
        let value = Arc::new(derive(&raw, key.granularity));
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn invalidate(&self, key: &SourceKey) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: entries.len(),
        }
    }
}
