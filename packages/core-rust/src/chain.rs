//! Ordered chain of tiers presented as a single [`KvStore`].
//!
//! Tiers are visited strictly in construction order, fastest first, one at a
//! time. Reads stop at the first tier that answers and backfill the tiers
//! before it. Writes go through to every tier. There is no cross-tier
//! transaction: a write failing on tier `n` leaves tiers `0..n` updated.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;

use crate::backfill::{backfill_batch, backfill_item};
use crate::batch::{dedup_keys, resolve, split_items, BatchResult};
use crate::config::ChainConfig;
use crate::context::StoreContext;
use crate::error::Result;
use crate::missing::{MissingCache, MissingCacheSettings};
use crate::registry::StoreRegistry;
use crate::settings::Settings;
use crate::store::{KvStore, StoreKey, StoreValue};

// ---------------------------------------------------------------------------
// ChainStoreBuilder
// ---------------------------------------------------------------------------

/// Wiring phase of a [`ChainStore`].
///
/// Tiers are appended in priority order. Once [`build()`](Self::build) hands
/// out the chain its tier list can no longer change, so every tier must be
/// added here, before the chain is shared with concurrent callers.
pub struct ChainStoreBuilder<K: StoreKey, V: StoreValue> {
    settings: Settings,
    tiers: Vec<Arc<dyn KvStore<K, V>>>,
    missing_cache: Option<MissingCacheSettings>,
}

impl<K: StoreKey, V: StoreValue> ChainStoreBuilder<K, V> {
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            tiers: Vec::new(),
            missing_cache: None,
        }
    }

    /// Starts a builder from configuration, resolving every declared backend
    /// kind through `registry`, in order.
    ///
    /// # Errors
    ///
    /// Fails on invalid settings, an unknown kind, or a failing constructor.
    pub fn from_config(config: &ChainConfig, registry: &StoreRegistry<K, V>) -> Result<Self> {
        config.settings.validate()?;

        let mut builder = Self::new(config.settings.clone());
        for kind in &config.elements {
            builder = builder.add_kind(registry, kind)?;
        }
        Ok(builder.with_missing_cache(config.missing_cache.clone()))
    }

    /// Appends an already constructed tier.
    #[must_use]
    pub fn add_store(mut self, store: Arc<dyn KvStore<K, V>>) -> Self {
        self.tiers.push(store);
        self
    }

    /// Appends the tier produced by `factory` from the chain's settings.
    ///
    /// # Errors
    ///
    /// Whatever `factory` returns.
    pub fn add_factory<F>(self, factory: F) -> Result<Self>
    where
        F: FnOnce(&Settings) -> Result<Arc<dyn KvStore<K, V>>>,
    {
        let store = factory(&self.settings)?;
        Ok(self.add_store(store))
    }

    /// Appends the tier registered under `kind`.
    ///
    /// # Errors
    ///
    /// [`KvStoreError::UnknownBackend`](crate::KvStoreError::UnknownBackend)
    /// or the constructor's error.
    pub fn add_kind(self, registry: &StoreRegistry<K, V>, kind: &str) -> Result<Self> {
        let store = registry.create(kind, &self.settings)?;
        tracing::debug!(
            store = %self.settings.name,
            kind = kind,
            position = self.tiers.len(),
            "tier added"
        );
        Ok(self.add_store(store))
    }

    /// Configures the missing-key cache; it is only created when
    /// `settings.enabled` is set.
    #[must_use]
    pub fn with_missing_cache(mut self, settings: MissingCacheSettings) -> Self {
        self.missing_cache = Some(settings);
        self
    }

    /// Finishes wiring.
    ///
    /// # Errors
    ///
    /// Fails on invalid settings or an invalid missing-cache configuration.
    pub fn build(self) -> Result<ChainStore<K, V>> {
        self.settings.validate()?;
        let missing_cache = self
            .missing_cache
            .as_ref()
            .filter(|settings| settings.enabled)
            .map(MissingCache::new)
            .transpose()?;

        tracing::debug!(
            store = %self.settings.name,
            tiers = self.tiers.len(),
            "chain store built"
        );

        Ok(ChainStore {
            settings: self.settings,
            tiers: self.tiers,
            missing_cache,
        })
    }
}

// ---------------------------------------------------------------------------
// ChainStore
// ---------------------------------------------------------------------------

/// Cascading key-value store over an immutable, ordered list of tiers.
///
/// Safe to share (`Arc<ChainStore>`) across any number of concurrent callers;
/// the tier list and settings are read-only after [`ChainStoreBuilder::build`].
pub struct ChainStore<K: StoreKey, V: StoreValue> {
    settings: Settings,
    tiers: Vec<Arc<dyn KvStore<K, V>>>,
    missing_cache: Option<MissingCache<K>>,
}

impl<K: StoreKey, V: StoreValue> ChainStore<K, V> {
    #[must_use]
    pub fn builder(settings: Settings) -> ChainStoreBuilder<K, V> {
        ChainStoreBuilder::new(settings)
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn tiers(&self) -> &[Arc<dyn KvStore<K, V>>] {
        &self.tiers
    }

    #[must_use]
    pub fn missing_cache(&self) -> Option<&MissingCache<K>> {
        self.missing_cache.as_ref()
    }

    /// Batch read returning hits and misses together.
    ///
    /// # Errors
    ///
    /// Same as [`KvStore::get_batch`].
    pub async fn get_batch_result(&self, ctx: &StoreContext, keys: &[K]) -> Result<BatchResult<K, V>> {
        let mut items = HashMap::with_capacity(keys.len());
        let missing = self.get_batch(ctx, keys, &mut items).await?;
        Ok(BatchResult { items, missing })
    }

    fn known_missing(&self, key: &K) -> bool {
        self.missing_cache
            .as_ref()
            .is_some_and(|cache| cache.contains(key))
    }

    async fn write_through(&self, ctx: &StoreContext, key: &K, value: &V) -> Result<()> {
        for tier in &self.tiers {
            ctx.run(tier.put(ctx, key, value)).await?;
        }
        Ok(())
    }

    async fn write_batch_through(&self, ctx: &StoreContext, items: &HashMap<K, V>) -> Result<()> {
        let chunks = split_items(items, self.settings.batch_size);
        for tier in &self.tiers {
            for chunk in &chunks {
                ctx.run(tier.put_batch(ctx, chunk)).await?;
            }
        }
        Ok(())
    }

    fn missing_generation(&self) -> u64 {
        self.missing_cache.as_ref().map_or(0, MissingCache::generation)
    }

    fn record_missing(&self, keys: &[K], since: u64) {
        if let Some(cache) = &self.missing_cache {
            cache.record(keys, since);
        }
    }

    fn forget_missing<'a>(&self, keys: impl IntoIterator<Item = &'a K>)
    where
        K: 'a,
    {
        if let Some(cache) = &self.missing_cache {
            cache.invalidate(keys);
        }
    }
}

#[async_trait]
impl<K: StoreKey, V: StoreValue> KvStore<K, V> for ChainStore<K, V> {
    fn name(&self) -> &str {
        &self.settings.name
    }

    async fn contains(&self, ctx: &StoreContext, key: &K) -> Result<bool> {
        for tier in &self.tiers {
            if ctx.run(tier.contains(ctx, key)).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn get(&self, ctx: &StoreContext, key: &K) -> Result<Option<V>> {
        ctx.check()?;
        let since = self.missing_generation();
        if self.known_missing(key) {
            return Ok(None);
        }

        for (index, tier) in self.tiers.iter().enumerate() {
            let Some(value) = ctx.run(tier.get(ctx, key)).await? else {
                continue;
            };

            tracing::debug!(store = %self.settings.name, tier = tier.name(), key = ?key, "hit");
            backfill_item(ctx, &self.settings.name, &self.tiers[..index], key, &value).await?;
            return Ok(Some(value));
        }

        self.record_missing(std::slice::from_ref(key), since);
        Ok(None)
    }

    async fn get_batch(
        &self,
        ctx: &StoreContext,
        keys: &[K],
        results: &mut HashMap<K, V>,
    ) -> Result<Vec<K>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        ctx.check()?;
        let since = self.missing_generation();
        let requested = dedup_keys(keys);
        let (working, skipped): (Vec<K>, Vec<K>) = requested
            .iter()
            .cloned()
            .partition(|key| !self.known_missing(key));

        let resolution = resolve(ctx, &self.tiers, working, results, self.settings.batch_size).await?;

        for (index, resolved) in &resolution.resolved_by {
            let found: HashMap<K, V> = resolved
                .iter()
                .filter_map(|key| results.get(key).map(|value| (key.clone(), value.clone())))
                .collect();
            backfill_batch(
                ctx,
                &self.settings.name,
                &self.tiers[..*index],
                &found,
                self.settings.batch_size,
            )
            .await?;
        }

        self.record_missing(&resolution.missing, since);

        let unresolved: HashSet<&K> = resolution.missing.iter().chain(&skipped).collect();
        let missing = requested
            .iter()
            .filter(|key| unresolved.contains(key))
            .cloned()
            .collect();
        Ok(missing)
    }

    async fn put(&self, ctx: &StoreContext, key: &K, value: &V) -> Result<()> {
        // Evicted on both sides of the writes: a read overlapping them must
        // not leave the key behind as missing.
        self.forget_missing([key]);
        let written = self.write_through(ctx, key, value).await;
        self.forget_missing([key]);
        written
    }

    async fn put_batch(&self, ctx: &StoreContext, items: &HashMap<K, V>) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        self.forget_missing(items.keys());
        let written = self.write_batch_through(ctx, items).await;
        self.forget_missing(items.keys());
        written
    }

    async fn delete(&self, ctx: &StoreContext, key: &K) -> Result<()> {
        for tier in self.tiers.iter().rev() {
            ctx.run(tier.delete(ctx, key)).await?;
        }
        self.forget_missing([key]);
        Ok(())
    }

    async fn delete_batch(&self, ctx: &StoreContext, keys: &[K]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let keys = dedup_keys(keys);
        for tier in self.tiers.iter().rev() {
            for chunk in keys.chunks(self.settings.batch_size.max(1)) {
                ctx.run(tier.delete_batch(ctx, chunk)).await?;
            }
        }
        self.forget_missing(&keys);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
