//! Configuration for a runtime container.

use ledger_store::SledConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::DEFAULT_CAPACITY;

/// Configuration for a [`Container`](crate::Container).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Container ID
    #[serde(default = "default_container_id")]
    pub container_id: String,
    /// Runtime version reported by `ping`
    #[serde(default = "default_version")]
    pub version: String,
    /// Initial log filter, e.g. "info" or "ledger_runtime=debug"
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Apply writes immediately instead of at transaction prepare
    #[serde(default = "default_autocommit")]
    pub autocommit: bool,
    /// Upper bound on one engine call
    #[serde(default)]
    pub call_timeout_ms: Option<u64>,
    /// Business networks kept parsed in memory
    #[serde(default = "default_cache_capacity")]
    pub definition_cache_capacity: usize,
    /// Storage backend
    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_container_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_autocommit() -> bool {
    true
}

fn default_cache_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            container_id: default_container_id(),
            version: default_version(),
            log_level: default_log_level(),
            autocommit: default_autocommit(),
            call_timeout_ms: None,
            definition_cache_capacity: default_cache_capacity(),
            storage: StorageConfig::default(),
        }
    }
}

impl ContainerConfig {
    /// Create a config with a fixed container ID.
    pub fn new(container_id: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
            ..Default::default()
        }
    }

    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_autocommit(mut self, autocommit: bool) -> Self {
        self.autocommit = autocommit;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }

    /// Load from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// Which storage backend a container uses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    #[default]
    Memory,
    Sled(SledConfig),
    Filesystem { root: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ContainerConfig::default();
        assert!(config.autocommit);
        assert_eq!(config.definition_cache_capacity, 8);
        assert!(config.call_timeout().is_none());
        assert!(matches!(config.storage, StorageConfig::Memory));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = ContainerConfig::new("test-container")
            .with_autocommit(false)
            .with_call_timeout(Duration::from_secs(5))
            .with_storage(StorageConfig::Filesystem {
                root: PathBuf::from("/var/lib/ledger"),
            });
        let yaml = config.to_yaml().unwrap();
        let parsed = ContainerConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.container_id, "test-container");
        assert!(!parsed.autocommit);
        assert_eq!(parsed.call_timeout(), Some(Duration::from_secs(5)));
        assert!(matches!(parsed.storage, StorageConfig::Filesystem { .. }));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let parsed = ContainerConfig::from_yaml(
            "container_id: c1\nstorage:\n  backend: sled\n  path: /tmp/ledger.sled\n",
        )
        .unwrap();
        assert_eq!(parsed.log_level, "info");
        match parsed.storage {
            StorageConfig::Sled(sled) => {
                assert_eq!(sled.path, PathBuf::from("/tmp/ledger.sled"));
                assert_eq!(sled.cache_capacity, 64 * 1024 * 1024);
            }
            other => panic!("unexpected storage {other:?}"),
        }
    }
}
