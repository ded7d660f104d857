//! JSON chain configuration.
//!
//! ```json
//! {
//!   "settings": {
//!     "appId": {"project": "shop", "environment": "prod", "family": "catalog", "application": "api"},
//!     "name": "products",
//!     "batchSize": 100,
//!     "ttlMs": 60000,
//!     "inMemory": {"maxSize": 10000},
//!     "durable": {"path": "/var/lib/shop/products.redb"}
//!   },
//!   "elements": ["inMemory", "redb"],
//!   "missingCache": {"enabled": true, "size": 10000, "ttlMs": 5000}
//! }
//! ```

use std::path::Path;

use anyhow::Context;
use cascade_core::{ChainConfig, ChainStore, ChainStoreBuilder, StoreKey, StoreValue};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::registry::default_registry;

/// Parses a chain declaration.
///
/// # Errors
///
/// Malformed JSON or settings that fail validation.
pub fn parse_config(raw: &str) -> anyhow::Result<ChainConfig> {
    let config: ChainConfig = serde_json::from_str(raw).context("invalid chain configuration")?;
    config.settings.validate()?;
    if config.elements.is_empty() {
        anyhow::bail!("chain {} declares no elements", config.settings.name);
    }
    Ok(config)
}

/// Reads and parses the chain declaration at `path`.
///
/// # Errors
///
/// The file cannot be read or does not parse, see [`parse_config`].
pub fn load_config(path: impl AsRef<Path>) -> anyhow::Result<ChainConfig> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read chain configuration {}", path.display()))?;
    parse_config(&raw).with_context(|| format!("in {}", path.display()))
}

/// Wires a chain from `config` using [`default_registry`].
///
/// # Errors
///
/// An unknown backend kind or a tier that fails to construct.
pub fn build_chain<K, V>(config: &ChainConfig) -> anyhow::Result<ChainStore<K, V>>
where
    K: StoreKey + Serialize,
    V: StoreValue + Serialize + DeserializeOwned,
{
    let registry = default_registry::<K, V>();
    let chain = ChainStoreBuilder::from_config(config, &registry)?.build()?;
    tracing::info!(
        store = %config.settings.qualified_name(),
        tiers = ?config.elements,
        missing_cache = config.missing_cache.enabled,
        "chain store ready"
    );
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use cascade_core::{KvStore, StoreContext};

    use super::*;

    #[test]
    fn parses_minimal_declaration() {
        let config = parse_config(r#"{"settings": {"name": "users"}, "elements": ["map"]}"#).unwrap();

        assert_eq!(config.settings.name, "users");
        assert_eq!(config.settings.batch_size, cascade_core::settings::DEFAULT_BATCH_SIZE);
        assert_eq!(config.elements, vec!["map"]);
        assert!(!config.missing_cache.enabled);
    }

    #[test]
    fn rejects_empty_elements() {
        let err = parse_config(r#"{"settings": {"name": "users"}, "elements": []}"#).unwrap_err();
        assert!(err.to_string().contains("no elements"), "{err}");
    }

    #[test]
    fn rejects_zero_batch_size() {
        let result = parse_config(r#"{"settings": {"name": "users", "batchSize": 0}, "elements": ["map"]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("absent.json"), "{err}");
    }

    #[tokio::test]
    async fn loads_and_builds_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"settings": {{"name": "users"}}, "elements": ["inMemory", "map"]}}"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        let chain: ChainStore<String, u32> = build_chain(&config).unwrap();
        let ctx = StoreContext::background();

        assert_eq!(chain.tiers().len(), 2);
        assert_eq!(chain.tiers()[0].name(), "users/inMemory");
        assert_eq!(chain.tiers()[1].name(), "users/map");

        chain.put(&ctx, &"a".to_string(), &1).await.unwrap();
        assert_eq!(chain.get(&ctx, &"a".to_string()).await.unwrap(), Some(1));
    }

    #[test]
    fn unknown_element_fails_build() {
        let config = parse_config(r#"{"settings": {"name": "users"}, "elements": ["memcached"]}"#).unwrap();
        let err = build_chain::<String, u32>(&config).err().unwrap();
        assert!(err.to_string().contains("memcached"), "{err}");
    }
}
