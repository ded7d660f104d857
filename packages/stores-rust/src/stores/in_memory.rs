//! Bounded in-process cache tier with optional expiry.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use cascade_core::{KvStore, KvStoreError, Result, Settings, StoreContext, StoreKey, StoreValue};
use quick_cache::sync::Cache;
use tokio::time::Instant;

/// Backend kind under which [`InMemoryStore`] is registered.
pub const KIND: &str = "inMemory";

#[derive(Clone)]
struct Entry<V> {
    value: V,
    expires_at: Option<Instant>,
}

/// Size-bounded cache tier backed by [`quick_cache`].
///
/// Holds at most `Settings.in_memory.max_size` entries; the least valuable
/// entries are evicted as new ones arrive. When `Settings.ttl` is set, each
/// entry expires that long after it was written and is dropped on the next
/// access.
pub struct InMemoryStore<K: StoreKey, V: StoreValue> {
    name: String,
    entries: Cache<K, Entry<V>>,
    ttl: Option<Duration>,
}

impl<K: StoreKey, V: StoreValue> InMemoryStore<K, V> {
    /// # Errors
    ///
    /// [`KvStoreError::InvalidArgument`] when the configured size is zero.
    pub fn new(settings: &Settings) -> Result<Self> {
        Self::with_capacity(
            format!("{}/{KIND}", settings.name),
            settings.in_memory.max_size,
            settings.ttl,
        )
    }

    /// # Errors
    ///
    /// [`KvStoreError::InvalidArgument`] when `max_size` is zero.
    pub fn with_capacity(
        name: impl Into<String>,
        max_size: usize,
        ttl: Option<Duration>,
    ) -> Result<Self> {
        let name = name.into();
        if max_size == 0 {
            return Err(KvStoreError::InvalidArgument(format!(
                "store {name}: in-memory max size must be greater than zero"
            )));
        }
        Ok(Self {
            name,
            entries: Cache::new(max_size),
            ttl,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: &K) -> Option<V> {
        let entry = self.entries.get(key)?;
        if entry.expires_at.is_some_and(|at| Instant::now() >= at) {
            self.entries.remove(key);
            return None;
        }
        Some(entry.value)
    }

    fn store(&self, key: K, value: V) {
        let expires_at = self.ttl.map(|ttl| Instant::now() + ttl);
        self.entries.insert(key, Entry { value, expires_at });
    }
}

#[async_trait]
impl<K: StoreKey, V: StoreValue> KvStore<K, V> for InMemoryStore<K, V> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn contains(&self, ctx: &StoreContext, key: &K) -> Result<bool> {
        ctx.check()?;
        Ok(self.lookup(key).is_some())
    }

    async fn get(&self, ctx: &StoreContext, key: &K) -> Result<Option<V>> {
        ctx.check()?;
        Ok(self.lookup(key))
    }

    async fn get_batch(
        &self,
        ctx: &StoreContext,
        keys: &[K],
        results: &mut HashMap<K, V>,
    ) -> Result<Vec<K>> {
        ctx.check()?;
        let mut missing = Vec::new();
        for key in keys {
            match self.lookup(key) {
                Some(value) => {
                    results.insert(key.clone(), value);
                }
                None => missing.push(key.clone()),
            }
        }
        Ok(missing)
    }

    async fn put(&self, ctx: &StoreContext, key: &K, value: &V) -> Result<()> {
        ctx.check()?;
        self.store(key.clone(), value.clone());
        Ok(())
    }

    async fn put_batch(&self, ctx: &StoreContext, items: &HashMap<K, V>) -> Result<()> {
        ctx.check()?;
        for (key, value) in items {
            self.store(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn delete(&self, ctx: &StoreContext, key: &K) -> Result<()> {
        ctx.check()?;
        self.entries.remove(key);
        Ok(())
    }

    async fn delete_batch(&self, ctx: &StoreContext, keys: &[K]) -> Result<()> {
        ctx.check()?;
        for key in keys {
            self.entries.remove(key);
        }
        Ok(())
    }
}
