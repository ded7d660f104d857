//! Chain identity and sizing configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::{KvStoreError, Result};

/// Default maximum number of keys or items sent to a tier in one call.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default capacity of the bounded in-process cache tier.
pub const DEFAULT_IN_MEMORY_MAX_SIZE: usize = 10_000;

/// Identity of the application owning a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppId {
    pub project: String,
    pub environment: String,
    pub family: String,
    pub application: String,
}

/// Options for the bounded in-process cache tier.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InMemorySettings {
    /// Maximum number of entries kept before eviction.
    pub max_size: usize,
}

impl Default for InMemorySettings {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_IN_MEMORY_MAX_SIZE,
        }
    }
}

/// Options for the durable embedded-database tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DurableSettings {
    /// Database file. Required by durable tiers, ignored by the others.
    pub path: Option<PathBuf>,
}

/// Settings identifying a chain and bounding the size of tier calls.
///
/// Every tier of a chain receives the same `Settings` when it is created
/// through a factory, so tier-specific options live here as nested sections.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub app_id: AppId,
    /// Logical store name. Used as table/namespace name by tiers.
    pub name: String,
    /// Maximum number of keys/items in any single tier batch call.
    pub batch_size: usize,
    /// Optional time-to-live applied by tiers that support expiry.
    #[serde(rename = "ttlMs", deserialize_with = "deserialize_millis")]
    pub ttl: Option<Duration>,
    pub in_memory: InMemorySettings,
    pub durable: DurableSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_id: AppId::default(),
            name: String::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            ttl: None,
            in_memory: InMemorySettings::default(),
            durable: DurableSettings::default(),
        }
    }
}

impl Settings {
    /// Creates settings for the named store with default sizing.
    #[must_use]
    pub fn new(app_id: AppId, name: impl Into<String>) -> Self {
        Self {
            app_id,
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Rejects settings no tier could operate with.
    ///
    /// # Errors
    ///
    /// [`KvStoreError::InvalidArgument`] for an empty name or a zero batch size.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(KvStoreError::InvalidArgument(
                "store name must not be empty".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(KvStoreError::InvalidArgument(format!(
                "store {}: batch size must be greater than zero",
                self.name
            )));
        }
        Ok(())
    }

    /// Fully qualified store name: `project-environment-family-application-name`.
    ///
    /// Empty identity segments are skipped.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        [
            self.app_id.project.as_str(),
            self.app_id.environment.as_str(),
            self.app_id.family.as_str(),
            self.app_id.application.as_str(),
            self.name.as_str(),
        ]
        .iter()
        .filter(|segment| !segment.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("-")
    }
}

/// Reads an optional millisecond count into a `Duration`.
///
/// # Errors
///
/// Propagates the deserializer's error for non-integer input.
pub fn deserialize_millis<'de, D>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?
        .filter(|millis| *millis > 0)
        .map(Duration::from_millis))
}
