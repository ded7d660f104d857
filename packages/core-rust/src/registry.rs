//! Registry mapping configured backend kinds to tier constructors.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{KvStoreError, Result};
use crate::settings::Settings;
use crate::store::{KvStore, StoreKey, StoreValue};

/// Builds a tier from the chain's settings.
pub type StoreConstructor<K, V> =
    Arc<dyn Fn(&Settings) -> Result<Arc<dyn KvStore<K, V>>> + Send + Sync>;

/// Lookup table from backend kind (e.g. `"inMemory"`) to constructor.
///
/// Populated once during wiring, then consulted by
/// [`ChainStoreBuilder`](crate::ChainStoreBuilder) when it resolves the
/// kinds listed in a [`ChainConfig`](crate::ChainConfig).
pub struct StoreRegistry<K: StoreKey, V: StoreValue> {
    constructors: HashMap<String, StoreConstructor<K, V>>,
}

impl<K: StoreKey, V: StoreValue> StoreRegistry<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Registers `constructor` under `kind`, replacing any earlier registration.
    pub fn register<F>(&mut self, kind: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(&Settings) -> Result<Arc<dyn KvStore<K, V>>> + Send + Sync + 'static,
    {
        self.constructors.insert(kind.into(), Arc::new(constructor));
        self
    }

    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Registered kinds, sorted.
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Instantiates the tier registered under `kind`.
    ///
    /// # Errors
    ///
    /// [`KvStoreError::UnknownBackend`] if nothing is registered under `kind`,
    /// otherwise whatever the constructor returns.
    pub fn create(&self, kind: &str, settings: &Settings) -> Result<Arc<dyn KvStore<K, V>>> {
        let constructor = self
            .constructors
            .get(kind)
            .ok_or_else(|| KvStoreError::UnknownBackend {
                kind: kind.to_string(),
            })?;
        constructor(settings)
    }
}

impl<K: StoreKey, V: StoreValue> Default for StoreRegistry<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
