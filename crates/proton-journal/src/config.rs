use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// When recorded transcripts are applied to storage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JournalMode {
    /// Inside `record`, before it returns.
    #[default]
    Inline,
    /// On a worker task started with `Journal::spawn`.
    Background,
}

/// Flush/sync strategy for the WAL.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// `fsync` after every write (safest, highest latency).
    EveryWrite,
    /// Rely on OS page-cache buffering (fastest, least durable).
    #[default]
    OsDefault,
}

/// Journal settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    pub mode: JournalMode,
    /// WAL file; without one the journal is volatile.
    pub wal: Option<PathBuf>,
    pub sync: SyncMode,
}
