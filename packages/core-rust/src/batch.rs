//! Batch resolution: narrowing a working set of keys across ordered tiers.
//!
//! Each tier is asked only for the keys every earlier tier failed to
//! resolve, in chunks of at most `batch_size` keys. The keys a tier resolves
//! are recorded per tier so the chain can backfill them into the tiers that
//! precede it.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::context::StoreContext;
use crate::error::Result;
use crate::store::{KvStore, StoreKey, StoreValue};

/// Accumulated outcome of a batch read.
#[derive(Debug, Clone)]
pub struct BatchResult<K, V> {
    /// Every key found, with its item.
    pub items: HashMap<K, V>,
    /// Keys no tier could resolve, in request order.
    pub missing: Vec<K>,
}

impl<K: StoreKey, V> BatchResult<K, V> {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

impl<K, V> Default for BatchResult<K, V> {
    fn default() -> Self {
        Self {
            items: HashMap::new(),
            missing: Vec::new(),
        }
    }
}

/// Outcome of [`resolve`]: what stayed missing and which tier resolved what.
#[derive(Debug)]
pub(crate) struct Resolution<K> {
    pub missing: Vec<K>,
    /// `(tier index, keys first found there)` for every tier after the first
    /// that resolved at least one key, in tier order.
    pub resolved_by: Vec<(usize, Vec<K>)>,
}

/// Removes duplicate keys, keeping the first occurrence of each.
pub(crate) fn dedup_keys<K: StoreKey>(keys: &[K]) -> Vec<K> {
    let mut seen = HashSet::with_capacity(keys.len());
    keys.iter()
        .filter(|key| seen.insert(*key))
        .cloned()
        .collect()
}

/// Splits `items` into maps of at most `size` entries.
///
/// Borrows `items` unchanged when it already fits, so the common case makes
/// no copies. A `size` of zero is treated as one.
pub fn split_items<K: StoreKey, V: StoreValue>(
    items: &HashMap<K, V>,
    size: usize,
) -> Vec<Cow<'_, HashMap<K, V>>> {
    let size = size.max(1);
    if items.len() <= size {
        return vec![Cow::Borrowed(items)];
    }

    let mut chunks = Vec::with_capacity(items.len().div_ceil(size));
    let mut current = HashMap::with_capacity(size);
    for (key, value) in items {
        current.insert(key.clone(), value.clone());
        if current.len() == size {
            chunks.push(Cow::Owned(std::mem::replace(
                &mut current,
                HashMap::with_capacity(size),
            )));
        }
    }
    if !current.is_empty() {
        chunks.push(Cow::Owned(current));
    }
    chunks
}

/// Walks `tiers` in order, narrowing `keys` until it is empty or the tiers
/// run out. Hits accumulate in `results`.
///
/// A tier is skipped entirely once the working set is empty. The first tier
/// error aborts the walk and is returned unchanged.
pub(crate) async fn resolve<K: StoreKey, V: StoreValue>(
    ctx: &StoreContext,
    tiers: &[Arc<dyn KvStore<K, V>>],
    keys: Vec<K>,
    results: &mut HashMap<K, V>,
    batch_size: usize,
) -> Result<Resolution<K>> {
    let mut working = keys;
    let mut resolved_by = Vec::new();

    for (index, tier) in tiers.iter().enumerate() {
        if working.is_empty() {
            break;
        }

        let mut still_missing = Vec::new();
        for chunk in working.chunks(batch_size.max(1)) {
            let missing = ctx.run(tier.get_batch(ctx, chunk, results)).await?;
            still_missing.extend(missing);
        }

        let missing_set: HashSet<&K> = still_missing.iter().collect();
        let resolved: Vec<K> = working
            .iter()
            .filter(|key| !missing_set.contains(key))
            .cloned()
            .collect();

        if !resolved.is_empty() {
            tracing::debug!(
                tier = tier.name(),
                resolved = resolved.len(),
                remaining = working.len() - resolved.len(),
                "batch keys resolved"
            );
            if index > 0 {
                resolved_by.push((index, resolved));
            }
        }

        // Only keys that were asked for can stay missing.
        let asked: HashSet<&K> = working.iter().collect();
        let next: Vec<K> = dedup_keys(&still_missing)
            .into_iter()
            .filter(|key| asked.contains(key))
            .collect();
        working = next;
    }

    Ok(Resolution {
        missing: working,
        resolved_by,
    })
}
