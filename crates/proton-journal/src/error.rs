use std::io;

use proton_store::StorageError;
use proton_types::{Address, ErrorClass};

/// Errors produced by the journal.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    /// I/O error during WAL operations.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A WAL entry failed to serialize.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Checkpoint length is beyond the current WAL write position.
    #[error("checkpoint of {requested} bytes exceeds current write position {current}")]
    InvalidCheckpoint { requested: u64, current: u64 },

    /// An in-flight transcript wipes the block; it must not be read.
    #[error("block scheduled for deletion: {0}")]
    ScheduledForDeletion(Address),

    /// Error from the storage backend.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The journal has been shut down and accepts no transcripts.
    #[error("journal is shut down")]
    Shutdown,
}

impl JournalError {
    /// The recoverability class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Io(_) | Self::Shutdown => ErrorClass::Io,
            Self::Serialization(_) | Self::InvalidCheckpoint { .. } => ErrorClass::Integrity,
            Self::ScheduledForDeletion(_) => ErrorClass::NotFound,
            Self::Storage(e) => e.class(),
        }
    }

    /// Whether a caller may recover from this error.
    pub fn is_recoverable(&self) -> bool {
        self.class().is_recoverable()
    }
}

impl From<JournalError> for StorageError {
    fn from(err: JournalError) -> Self {
        match err {
            JournalError::Storage(e) => e,
            JournalError::ScheduledForDeletion(address) => StorageError::PendingDeletion(address),
            JournalError::Io(e) => StorageError::Io(e),
            other => StorageError::Unavailable(other.to_string()),
        }
    }
}

/// Convenience alias used throughout the journal crate.
pub type JournalResult<T> = Result<T, JournalError>;
