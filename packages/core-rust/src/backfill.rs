//! Write-back of items found in a slower tier into the faster tiers before it.
//!
//! Backfill only warms caches. A failing tier is logged, counted and skipped;
//! the read that triggered the backfill still succeeds. The one exception is
//! the caller's own context: once it is cancelled or past its deadline the
//! remaining writes are abandoned and the context error is returned.

use std::collections::HashMap;
use std::sync::Arc;

use crate::batch::split_items;
use crate::context::StoreContext;
use crate::error::{KvStoreError, Result};
use crate::store::{KvStore, StoreKey, StoreValue};

fn record_failure(store: &str, tier: &str, operation: &'static str, error: &KvStoreError) {
    tracing::warn!(
        store = store,
        tier = tier,
        operation = operation,
        error = %error,
        "backfill write failed"
    );
    metrics::counter!(
        "kvstore_backfill_errors_total",
        "store" => store.to_string(),
        "tier" => tier.to_string()
    )
    .increment(1);
}

/// Writes `key`/`value` into every tier of `faster`, in order.
///
/// # Errors
///
/// Only the context error, when `ctx` fires before or during the writes.
pub(crate) async fn backfill_item<K: StoreKey, V: StoreValue>(
    ctx: &StoreContext,
    store: &str,
    faster: &[Arc<dyn KvStore<K, V>>],
    key: &K,
    value: &V,
) -> Result<()> {
    for tier in faster {
        match ctx.run(tier.put(ctx, key, value)).await {
            Ok(()) => tracing::debug!(store = store, tier = tier.name(), key = ?key, "backfilled"),
            Err(error) => {
                ctx.check()?;
                record_failure(store, tier.name(), "put", &error);
            }
        }
    }
    Ok(())
}

/// Writes `items` into every tier of `faster`, in order, in chunks of at most
/// `batch_size` items.
///
/// A tier whose chunk fails gets no further chunks; the next tier is still
/// attempted.
///
/// # Errors
///
/// Only the context error, when `ctx` fires before or during the writes.
pub(crate) async fn backfill_batch<K: StoreKey, V: StoreValue>(
    ctx: &StoreContext,
    store: &str,
    faster: &[Arc<dyn KvStore<K, V>>],
    items: &HashMap<K, V>,
    batch_size: usize,
) -> Result<()> {
    if items.is_empty() {
        return Ok(());
    }

    let chunks = split_items(items, batch_size);
    for tier in faster {
        for chunk in &chunks {
            if let Err(error) = ctx.run(tier.put_batch(ctx, chunk)).await {
                ctx.check()?;
                record_failure(store, tier.name(), "put_batch", &error);
                break;
            }
        }
        tracing::debug!(
            store = store,
            tier = tier.name(),
            items = items.len(),
            "batch backfill attempted"
        );
    }
    Ok(())
}
