use serde::{Deserialize, Serialize};

/// Default resident budget: 1 MiB of unused payload.
pub const DEFAULT_THRESHOLD: u64 = 1 << 20;

/// Nest settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NestConfig {
    /// Bytes of queued (unused) footprint tolerated before pre-publication.
    pub threshold: u64,
}

impl Default for NestConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}
