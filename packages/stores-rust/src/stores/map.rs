//! Unbounded in-process [`KvStore`] backed by [`DashMap`].
//!
//! Provides concurrent read/write access without external locking and never
//! evicts. Suitable for tests, for small reference data, and as a stand-in
//! for a remote tier during development.

use std::collections::HashMap;

use async_trait::async_trait;
use cascade_core::{KvStore, Result, Settings, StoreContext, StoreKey, StoreValue};
use dashmap::DashMap;

/// Backend kind under which [`MapStore`] is registered.
pub const KIND: &str = "map";

/// In-memory tier backed by [`DashMap`].
///
/// Readers never block each other; writers contend only on the shard that
/// holds their key.
pub struct MapStore<K: StoreKey, V: StoreValue> {
    name: String,
    entries: DashMap<K, V>,
}

impl<K: StoreKey, V: StoreValue> MapStore<K, V> {
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self::named(format!("{}/{KIND}", settings.name))
    }

    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: DashMap::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Point-in-time copy of all entries.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<K, V> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

#[async_trait]
impl<K: StoreKey, V: StoreValue> KvStore<K, V> for MapStore<K, V> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn contains(&self, ctx: &StoreContext, key: &K) -> Result<bool> {
        ctx.check()?;
        Ok(self.entries.contains_key(key))
    }

    async fn get(&self, ctx: &StoreContext, key: &K) -> Result<Option<V>> {
        ctx.check()?;
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
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
            match self.entries.get(key) {
                Some(entry) => {
                    results.insert(key.clone(), entry.value().clone());
                }
                None => missing.push(key.clone()),
            }
        }
        Ok(missing)
    }

    async fn put(&self, ctx: &StoreContext, key: &K, value: &V) -> Result<()> {
        ctx.check()?;
        self.entries.insert(key.clone(), value.clone());
        Ok(())
    }

    async fn put_batch(&self, ctx: &StoreContext, items: &HashMap<K, V>) -> Result<()> {
        ctx.check()?;
        for (key, value) in items {
            self.entries.insert(key.clone(), value.clone());
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
