//! Configuration loader for the command-line front end. The core store never
//! reads configuration itself; callers build a `HashEngine` and pick a store
//! path from the values resolved here.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::crypto::passwords::{HashEngine, HashParams};

const DEFAULT_STORE_PATH: &str = "passwords.json";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file unreadable: {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config parse failed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawConfig {
    pub store_path: Option<PathBuf>,
    pub hashing: Option<HashParams>,
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub store_path: PathBuf,
    pub hash_params: HashParams,
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            hash_params: HashParams::default(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Builds the hash engine described by this config.
    pub fn hash_engine(&self) -> Result<HashEngine, ConfigError> {
        HashEngine::new(self.hash_params).map_err(|e| ConfigError::Invalid(format!("{e}")))
    }
}

impl TryFrom<RawConfig> for RuntimeConfig {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let defaults = RuntimeConfig::default();
        let store_path = raw.store_path.unwrap_or(defaults.store_path);
        if store_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("storePath must not be empty".to_string()));
        }

        let config = RuntimeConfig {
            store_path,
            hash_params: raw.hashing.unwrap_or(defaults.hash_params),
            log_level: raw.log_level.unwrap_or(defaults.log_level),
        };
        // Surface bad cost settings at load time rather than on first hash.
        config.hash_engine()?;
        Ok(config)
    }
}

/// Loads the JSON configuration file and fills in defaults for absent values.
pub fn load_config(path: impl AsRef<Path>) -> Result<RuntimeConfig, ConfigError> {
    let path = path.as_ref();
    let raw_json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: RawConfig = serde_json::from_str(&raw_json)?;
    RuntimeConfig::try_from(raw)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::NamedTempFile;

    use super::{load_config, ConfigError, RuntimeConfig};
    use crate::crypto::passwords::HashParams;

    fn write_config(payload: serde_json::Value) -> NamedTempFile {
        let file = NamedTempFile::new().expect("temp file");
        std::fs::write(file.path(), serde_json::to_vec(&payload).unwrap()).unwrap();
        file
    }

    #[test]
    fn loads_full_config() {
        let file = write_config(json!({
            "storePath": "/var/lib/hashkeep/store.json",
            "hashing": { "memoryCostKib": 4096, "timeCost": 2, "parallelism": 1 },
            "logLevel": "debug"
        }));

        let config = load_config(file.path()).expect("config should load");
        assert_eq!(
            config,
            RuntimeConfig {
                store_path: PathBuf::from("/var/lib/hashkeep/store.json"),
                hash_params: HashParams {
                    memory_cost_kib: 4096,
                    time_cost: 2,
                    parallelism: 1,
                },
                log_level: "debug".to_string(),
            }
        );
    }

    #[test]
    fn missing_fields_take_defaults() {
        let file = write_config(json!({ "hashing": { "timeCost": 4 } }));
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.store_path, PathBuf::from("passwords.json"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.hash_params.time_cost, 4);
        assert_eq!(config.hash_params.memory_cost_kib, HashParams::default().memory_cost_kib);
    }

    #[test]
    fn rejects_unknown_fields() {
        let file = write_config(json!({ "storepath": "typo.json" }));
        assert!(matches!(load_config(file.path()), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn rejects_unusable_hash_params() {
        let file = write_config(json!({ "hashing": { "memoryCostKib": 1 } }));
        assert!(matches!(load_config(file.path()), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_config("/nonexistent/hashkeep.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
