//! Negative cache of keys known to be absent from every tier.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use quick_cache::sync::Cache;
use serde::Deserialize;
use tokio::time::Instant;

use crate::error::{KvStoreError, Result};
use crate::settings::deserialize_millis;
use crate::store::StoreKey;

/// Default number of absent keys remembered.
pub const DEFAULT_MISSING_CACHE_SIZE: usize = 10_000;

/// Configuration of the chain's missing-key cache.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MissingCacheSettings {
    pub enabled: bool,
    pub size: usize,
    /// How long a miss is trusted. `None` keeps it until evicted or overwritten.
    #[serde(rename = "ttlMs", deserialize_with = "deserialize_millis")]
    pub ttl: Option<Duration>,
}

impl Default for MissingCacheSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            size: DEFAULT_MISSING_CACHE_SIZE,
            ttl: None,
        }
    }
}

/// Bounded set of absent keys with an optional time-to-live.
///
/// Writes through the chain evict the written keys, so the cache only ever
/// hides keys the chain itself observed as missing.
///
/// Every invalidation bumps a write generation. A reader samples the
/// generation before walking the tiers and hands it to [`record`](Self::record);
/// a miss observed while a write was in flight is discarded.
pub struct MissingCache<K: StoreKey> {
    entries: Cache<K, Instant>,
    ttl: Option<Duration>,
    generation: AtomicU64,
}

impl<K: StoreKey> MissingCache<K> {
    /// # Errors
    ///
    /// [`KvStoreError::InvalidArgument`] when `size` is zero.
    pub fn new(settings: &MissingCacheSettings) -> Result<Self> {
        if settings.size == 0 {
            return Err(KvStoreError::InvalidArgument(
                "missing cache size must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            entries: Cache::new(settings.size),
            ttl: settings.ttl,
            generation: AtomicU64::new(0),
        })
    }

    /// Whether `key` was recorded as missing and the record is still fresh.
    pub fn contains(&self, key: &K) -> bool {
        let Some(recorded) = self.entries.get(key) else {
            return false;
        };
        match self.ttl {
            Some(ttl) if recorded.elapsed() >= ttl => {
                self.entries.remove(key);
                false
            }
            _ => true,
        }
    }

    pub fn insert(&self, key: K) {
        self.entries.insert(key, Instant::now());
    }

    pub fn remove(&self, key: &K) {
        self.entries.remove(key);
    }

    /// Current write generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Records `keys` as missing, unless a write invalidated the cache since
    /// the reader sampled `since`.
    ///
    /// The entries are inserted first and withdrawn if the generation moved,
    /// so an invalidation racing with this call always wins.
    pub fn record(&self, keys: &[K], since: u64) {
        for key in keys {
            self.entries.insert(key.clone(), Instant::now());
        }
        if self.generation() != since {
            for key in keys {
                self.entries.remove(key);
            }
        }
    }

    /// Bumps the write generation and evicts `keys`.
    pub fn invalidate<'a>(&self, keys: impl IntoIterator<Item = &'a K>)
    where
        K: 'a,
    {
        self.generation.fetch_add(1, Ordering::SeqCst);
        for key in keys {
            self.entries.remove(key);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.len() == 0
    }
}
