//! Declarative chain wiring: settings plus the ordered list of backend kinds.

use serde::Deserialize;

use crate::missing::MissingCacheSettings;
use crate::settings::Settings;

/// A chain as declared in configuration.
///
/// `elements` names backend kinds resolved through a
/// [`StoreRegistry`](crate::StoreRegistry), fastest tier first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChainConfig {
    pub settings: Settings,
    pub elements: Vec<String>,
    pub missing_cache: MissingCacheSettings,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn parses_elements_in_order() {
        let config: ChainConfig = serde_json::from_str(
            r#"{
                "settings": {"name": "sessions", "batchSize": 50},
                "elements": ["inMemory", "redb"],
                "missingCache": {"enabled": true, "ttlMs": 30000}
            }"#,
        )
        .unwrap();

        assert_eq!(config.settings.name, "sessions");
        assert_eq!(config.settings.batch_size, 50);
        assert_eq!(config.elements, vec!["inMemory", "redb"]);
        assert!(config.missing_cache.enabled);
        assert_eq!(config.missing_cache.ttl, Some(Duration::from_secs(30)));
    }

    #[test]
    fn missing_cache_is_off_by_default() {
        let config: ChainConfig = serde_json::from_str(r#"{"elements": ["map"]}"#).unwrap();
        assert!(!config.missing_cache.enabled);
    }
}
