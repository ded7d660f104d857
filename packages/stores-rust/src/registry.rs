//! Registry pre-populated with every tier this crate ships.

use std::sync::Arc;

use cascade_core::{KvStore, Result, Settings, StoreKey, StoreRegistry, StoreValue};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::stores::{in_memory, map, null, InMemoryStore, MapStore, MeteredStore, NullStore};

fn metered<K: StoreKey, V: StoreValue>(store: Arc<dyn KvStore<K, V>>) -> Arc<dyn KvStore<K, V>> {
    Arc::new(MeteredStore::new(store))
}

/// Builds a registry with the `null`, `map`, `inMemory` and, with the `redb`
/// feature, `redb` backends. Every constructed tier is wrapped in a
/// [`MeteredStore`].
///
/// Keys and values must be serializable so that the durable backend can be
/// offered for any chain this registry serves.
#[must_use]
pub fn default_registry<K, V>() -> StoreRegistry<K, V>
where
    K: StoreKey + Serialize,
    V: StoreValue + Serialize + DeserializeOwned,
{
    let mut registry = StoreRegistry::new();
    registry
        .register(null::KIND, |settings: &Settings| -> Result<Arc<dyn KvStore<K, V>>> {
            Ok(metered(Arc::new(NullStore::new(settings))))
        })
        .register(map::KIND, |settings: &Settings| -> Result<Arc<dyn KvStore<K, V>>> {
            Ok(metered(Arc::new(MapStore::new(settings))))
        })
        .register(in_memory::KIND, |settings: &Settings| -> Result<Arc<dyn KvStore<K, V>>> {
            Ok(metered(Arc::new(InMemoryStore::new(settings)?)))
        });

    #[cfg(feature = "redb")]
    registry.register(
        crate::stores::redb::KIND,
        |settings: &Settings| -> Result<Arc<dyn KvStore<K, V>>> {
            Ok(metered(Arc::new(crate::stores::RedbStore::new(settings)?)))
        },
    );

    registry
}
