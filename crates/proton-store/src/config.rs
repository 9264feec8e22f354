use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which storage backend to build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageBackend {
    /// Volatile, process-local.
    #[default]
    Memory,
    /// One file per block under `path`.
    Directory,
}

/// Storage settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Root directory; required by the directory backend.
    pub path: Option<PathBuf>,
}
