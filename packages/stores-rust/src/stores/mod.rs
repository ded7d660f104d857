//! Concrete [`KvStore`](cascade_core::KvStore) tiers.
//!
//! - [`NullStore`]: holds nothing, accepts every write
//! - [`MapStore`]: unbounded concurrent map
//! - [`InMemoryStore`]: bounded cache with optional expiry
//! - [`RedbStore`]: durable embedded database (feature `redb`)
//! - [`MeteredStore`]: metrics decorator around any tier

pub mod in_memory;
pub mod map;
pub mod metered;
pub mod null;
#[cfg(feature = "redb")]
pub mod redb;

pub use in_memory::InMemoryStore;
pub use map::MapStore;
pub use metered::MeteredStore;
pub use null::NullStore;
#[cfg(feature = "redb")]
pub use self::redb::RedbStore;
