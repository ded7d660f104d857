//! No-op [`KvStore`] implementation.
//!
//! [`NullStore`] discards all writes and reports every key as absent.
//! Useful as a placeholder tier in configuration, in benchmarks, and for
//! disabling a backend without rewiring the chain.

use std::collections::HashMap;

use async_trait::async_trait;
use cascade_core::{KvStore, Result, Settings, StoreContext, StoreKey, StoreValue};

/// Backend kind under which [`NullStore`] is registered.
pub const KIND: &str = "null";

/// Tier that holds nothing.
///
/// All write operations succeed immediately without side effects.
/// All read operations report absence.
pub struct NullStore {
    name: String,
}

impl NullStore {
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self {
            name: format!("{}/{KIND}", settings.name),
        }
    }
}

#[async_trait]
impl<K: StoreKey, V: StoreValue> KvStore<K, V> for NullStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn contains(&self, ctx: &StoreContext, _key: &K) -> Result<bool> {
        ctx.check()?;
        Ok(false)
    }

    async fn get(&self, ctx: &StoreContext, _key: &K) -> Result<Option<V>> {
        ctx.check()?;
        Ok(None)
    }

    async fn get_batch(
        &self,
        ctx: &StoreContext,
        keys: &[K],
        _results: &mut HashMap<K, V>,
    ) -> Result<Vec<K>> {
        ctx.check()?;
        Ok(keys.to_vec())
    }

    async fn put(&self, ctx: &StoreContext, _key: &K, _value: &V) -> Result<()> {
        ctx.check()
    }

    async fn put_batch(&self, ctx: &StoreContext, _items: &HashMap<K, V>) -> Result<()> {
        ctx.check()
    }

    async fn delete(&self, ctx: &StoreContext, _key: &K) -> Result<()> {
        ctx.check()
    }

    async fn delete_batch(&self, ctx: &StoreContext, _keys: &[K]) -> Result<()> {
        ctx.check()
    }
}
