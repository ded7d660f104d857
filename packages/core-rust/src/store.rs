//! The uniform contract every tier implements.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use async_trait::async_trait;

use crate::context::StoreContext;
use crate::error::Result;

/// Bounds required of keys: comparable, hashable, cheap enough to clone.
pub trait StoreKey: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

impl<T> StoreKey for T where T: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

/// Bounds required of stored items.
pub trait StoreValue: Clone + Send + Sync + 'static {}

impl<T> StoreValue for T where T: Clone + Send + Sync + 'static {}

/// A key-value backend usable as one tier of a [`ChainStore`](crate::ChainStore).
///
/// Absence is not an error: `contains` returns `false`, `get` returns `None`
/// and `get_batch` lists the key as missing, all with `Ok`. Implementations
/// should return promptly with the context error once `ctx` is cancelled.
///
/// Used as `Arc<dyn KvStore<K, V>>`; the same instance may sit in several chains.
#[async_trait]
pub trait KvStore<K: StoreKey, V: StoreValue>: Send + Sync {
    /// Name used in logs, metrics and error messages.
    fn name(&self) -> &str;

    /// Whether the key is present.
    async fn contains(&self, ctx: &StoreContext, key: &K) -> Result<bool>;

    /// Looks up a single key.
    async fn get(&self, ctx: &StoreContext, key: &K) -> Result<Option<V>>;

    /// Looks up several keys at once.
    ///
    /// Every hit is inserted into `results`; entries already in `results`
    /// are left alone. Returns the subset of `keys` that was not found.
    async fn get_batch(
        &self,
        ctx: &StoreContext,
        keys: &[K],
        results: &mut HashMap<K, V>,
    ) -> Result<Vec<K>>;

    /// Inserts or replaces a single item.
    async fn put(&self, ctx: &StoreContext, key: &K, value: &V) -> Result<()>;

    /// Inserts or replaces several items.
    async fn put_batch(&self, ctx: &StoreContext, items: &HashMap<K, V>) -> Result<()>;

    /// Removes a key. Removing an absent key succeeds.
    async fn delete(&self, ctx: &StoreContext, key: &K) -> Result<()>;

    /// Removes several keys.
    async fn delete_batch(&self, ctx: &StoreContext, keys: &[K]) -> Result<()>;
}
