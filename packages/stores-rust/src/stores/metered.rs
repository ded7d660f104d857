//! Tier decorator recording access metrics.
//!
//! Records, per store and operation:
//! - `kvstore_requests_total`: every call
//! - `kvstore_hits_total` / `kvstore_misses_total`: read outcomes, per key
//! - `kvstore_errors_total`: failures other than caller cancellation
//! - `kvstore_operation_seconds`: call latency

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use cascade_core::{KvStore, Result, StoreContext, StoreKey, StoreValue};

/// Wraps a tier and reports its traffic through the `metrics` facade.
///
/// Without an installed recorder the calls are no-ops, so wrapping is safe
/// in tests and tools.
pub struct MeteredStore<K: StoreKey, V: StoreValue> {
    inner: Arc<dyn KvStore<K, V>>,
}

impl<K: StoreKey, V: StoreValue> MeteredStore<K, V> {
    #[must_use]
    pub fn new(inner: Arc<dyn KvStore<K, V>>) -> Self {
        Self { inner }
    }

    #[must_use]
    pub fn inner(&self) -> &Arc<dyn KvStore<K, V>> {
        &self.inner
    }

    async fn observe<T, F>(&self, operation: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let store = self.inner.name().to_string();
        let start = Instant::now();
        let result = fut.await;

        metrics::counter!("kvstore_requests_total", "store" => store.clone(), "operation" => operation)
            .increment(1);
        metrics::histogram!("kvstore_operation_seconds", "store" => store.clone(), "operation" => operation)
            .record(start.elapsed().as_secs_f64());

        if let Err(error) = &result {
            if !error.is_cancellation() {
                tracing::debug!(store = %store, operation = operation, error = %error, "store operation failed");
                metrics::counter!("kvstore_errors_total", "store" => store, "operation" => operation)
                    .increment(1);
            }
        }
        result
    }

    fn record_reads(&self, operation: &'static str, hits: usize, misses: usize) {
        let store = self.inner.name().to_string();
        metrics::counter!("kvstore_hits_total", "store" => store.clone(), "operation" => operation)
            .increment(hits as u64);
        metrics::counter!("kvstore_misses_total", "store" => store, "operation" => operation)
            .increment(misses as u64);
    }
}

#[async_trait]
impl<K: StoreKey, V: StoreValue> KvStore<K, V> for MeteredStore<K, V> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn contains(&self, ctx: &StoreContext, key: &K) -> Result<bool> {
        let exists = self.observe("contains", self.inner.contains(ctx, key)).await?;
        self.record_reads("contains", usize::from(exists), usize::from(!exists));
        Ok(exists)
    }

    async fn get(&self, ctx: &StoreContext, key: &K) -> Result<Option<V>> {
        let value = self.observe("get", self.inner.get(ctx, key)).await?;
        let hit = value.is_some();
        self.record_reads("get", usize::from(hit), usize::from(!hit));
        Ok(value)
    }

    async fn get_batch(
        &self,
        ctx: &StoreContext,
        keys: &[K],
        results: &mut HashMap<K, V>,
    ) -> Result<Vec<K>> {
        let missing = self
            .observe("get_batch", self.inner.get_batch(ctx, keys, results))
            .await?;
        self.record_reads(
            "get_batch",
            keys.len().saturating_sub(missing.len()),
            missing.len(),
        );
        Ok(missing)
    }

    async fn put(&self, ctx: &StoreContext, key: &K, value: &V) -> Result<()> {
        self.observe("put", self.inner.put(ctx, key, value)).await
    }

    async fn put_batch(&self, ctx: &StoreContext, items: &HashMap<K, V>) -> Result<()> {
        self.observe("put_batch", self.inner.put_batch(ctx, items)).await
    }

    async fn delete(&self, ctx: &StoreContext, key: &K) -> Result<()> {
        self.observe("delete", self.inner.delete(ctx, key)).await
    }

    async fn delete_batch(&self, ctx: &StoreContext, keys: &[K]) -> Result<()> {
        self.observe("delete_batch", self.inner.delete_batch(ctx, keys)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MapStore;

    #[tokio::test]
    async fn passes_calls_through_unchanged() {
        let inner: Arc<MapStore<String, u32>> = Arc::new(MapStore::named("test/map"));
        let metered: MeteredStore<String, u32> = MeteredStore::new(inner.clone());
        let ctx = StoreContext::background();

        metered.put(&ctx, &"a".to_string(), &1).await.unwrap();
        assert_eq!(inner.len(), 1);
        assert_eq!(metered.get(&ctx, &"a".to_string()).await.unwrap(), Some(1));
        assert_eq!(metered.name(), "test/map");

        let mut results = HashMap::new();
        let missing = metered
            .get_batch(&ctx, &["a".to_string(), "b".to_string()], &mut results)
            .await
            .unwrap();
        assert_eq!(missing, vec!["b".to_string()]);

        metered.delete(&ctx, &"a".to_string()).await.unwrap();
        assert!(inner.is_empty());
    }

    #[tokio::test]
    async fn errors_are_returned_as_is() {
        let metered: MeteredStore<String, u32> =
            MeteredStore::new(Arc::new(MapStore::named("test/map")));
        let ctx = StoreContext::background();
        ctx.cancel();

        let result = metered.contains(&ctx, &"a".to_string()).await;
        assert!(matches!(result, Err(cascade_core::KvStoreError::Cancelled)));
    }
}
