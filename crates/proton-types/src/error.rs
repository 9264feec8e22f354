use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("unknown {what} tag: {tag}")]
    UnknownTag { what: &'static str, tag: u8 },
}

/// Coarse classification of a failure, shared by every proton error enum.
///
/// Callers use it to decide between retrying, re-deriving, or aborting the
/// current scope without matching on crate-specific variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Unknown serialization format. Never silently defaulted.
    ProtocolFormat,
    /// The block does not exist (yet), or not at the requested address.
    NotFound,
    /// Write-once or revision conflict; re-derive from the winner and retry.
    Conflict,
    /// Corruption or broken clef management (bad signature, wrong secret).
    Integrity,
    /// Backend I/O trouble: timeouts, unavailability, filesystem errors.
    Io,
}

impl ErrorClass {
    /// Whether a caller may reasonably recover from this class of error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotFound | Self::Conflict | Self::Io)
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProtocolFormat => write!(f, "protocol-format"),
            Self::NotFound => write!(f, "not-found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Integrity => write!(f, "integrity"),
            Self::Io => write!(f, "io"),
        }
    }
}
