use serde::{Deserialize, Serialize};

/// Running counters of one nest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestStatistics {
    /// Blocks attached.
    pub attached: u64,
    /// Successful loads.
    pub loads: u64,
    /// Loads that had to fetch from storage.
    pub misses: u64,
    /// Dirty or transient blocks written through during eviction.
    pub prepublications: u64,
    /// Payloads dropped from memory.
    pub evictions: u64,
    /// Actions handed out by `transcribe`.
    pub transcribed: u64,
}
