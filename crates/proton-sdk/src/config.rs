use std::fs;
use std::path::Path;

use proton_journal::JournalConfig;
use proton_nest::NestConfig;
use proton_store::{StorageBackend, StorageConfig};
use proton_types::Network;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};
use crate::logging::LogFormat;

/// Default network name.
pub const DEFAULT_NETWORK: &str = "proton";

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Pretty,
        }
    }
}

/// Everything a [`Depot`](crate::Depot) needs, one section per layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtonConfig {
    /// Name the network digest is derived from.
    pub network: String,
    pub nest: NestConfig,
    pub storage: StorageConfig,
    pub journal: JournalConfig,
    pub log: LogConfig,
}

impl Default for ProtonConfig {
    fn default() -> Self {
        Self {
            network: DEFAULT_NETWORK.into(),
            nest: NestConfig::default(),
            storage: StorageConfig::default(),
            journal: JournalConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl ProtonConfig {
    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(source).map_err(|e| SdkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let source = fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string(self).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn validate(&self) -> SdkResult<()> {
        if self.network.is_empty() {
            return Err(SdkError::Config("network name is empty".into()));
        }
        if self.storage.backend == StorageBackend::Directory && self.storage.path.is_none() {
            return Err(SdkError::Config("directory storage needs a path".into()));
        }
        Ok(())
    }

    pub fn network(&self) -> Network {
        Network::named(&self.network)
    }
}
