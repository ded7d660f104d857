//! Cascade Stores: concrete tiers and wiring for [`cascade_core`] chains.
//!
//! Ships the `null`, `map`, `inMemory` and `redb` backends, a registry that
//! resolves them by kind, JSON configuration loading and logging setup.

pub mod config;
pub mod registry;
pub mod stores;
pub mod telemetry;

pub use config::{build_chain, load_config, parse_config};
pub use registry::default_registry;
#[cfg(feature = "redb")]
pub use stores::RedbStore;
pub use stores::{InMemoryStore, MapStore, MeteredStore, NullStore};
