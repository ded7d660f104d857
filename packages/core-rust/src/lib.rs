//! Cascade Core: tiered key-value store contract, chain orchestration, backfill.
//!
//! A [`ChainStore`] presents an ordered list of heterogeneous [`KvStore`]
//! tiers (in-process cache, remote cache, durable store, ...) as a single
//! store. Reads walk the tiers fastest first and backfill the tiers that
//! missed; writes go through to every tier.

pub mod backfill;
pub mod batch;
pub mod chain;
pub mod config;
pub mod context;
pub mod error;
pub mod missing;
pub mod registry;
pub mod settings;
pub mod store;

#[cfg(test)]
mod testing;

pub use batch::{split_items, BatchResult};
pub use chain::{ChainStore, ChainStoreBuilder};
pub use config::ChainConfig;
pub use context::StoreContext;
pub use error::{KvStoreError, Result};
pub use missing::{MissingCache, MissingCacheSettings};
pub use registry::{StoreConstructor, StoreRegistry};
pub use settings::{AppId, DurableSettings, InMemorySettings, Settings};
pub use store::{KvStore, StoreKey, StoreValue};

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {
        // Empty body: if this test runs, the crate compiles and loads.
    }
}
