use proton_block::BlockError;
use proton_types::{Address, ErrorClass, Revision};

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No block at the address, or not at the requested revision.
    #[error("block not found: {address} at revision {revision}")]
    NotFound { address: Address, revision: Revision },

    /// An immutable block already exists at the address.
    #[error("block already exists: {0}")]
    AlreadyExists(Address),

    /// A mutable block neither derives the stored revision nor wins the tie-break.
    #[error("mutable block conflict at {address}: stored revision {current}, incoming revision {incoming}")]
    Conflict {
        address: Address,
        current: u64,
        incoming: u64,
    },

    /// The backend did not answer in time.
    #[error("storage timeout on {0}")]
    Timeout(Address),

    /// The backend cannot serve requests at all.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The block failed to encode, decode or validate.
    #[error(transparent)]
    Block(#[from] BlockError),

    /// Storage operations need a valid address.
    #[error("null address passed to storage")]
    NullAddress,

    /// The block is the target of a wipe that has not been applied yet.
    #[error("block scheduled for deletion: {0}")]
    PendingDeletion(Address),
}

impl StorageError {
    /// The recoverability class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound { .. } | Self::NullAddress | Self::PendingDeletion(_) => {
                ErrorClass::NotFound
            }
            Self::AlreadyExists(_) | Self::Conflict { .. } => ErrorClass::Conflict,
            Self::Timeout(_) | Self::Unavailable(_) | Self::Io(_) => ErrorClass::Io,
            Self::Block(e) => e.class(),
        }
    }

    /// Whether a caller may recover from this error.
    pub fn is_recoverable(&self) -> bool {
        self.class().is_recoverable()
    }
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_follow_the_taxonomy() {
        let address = Address::null();
        assert_eq!(StorageError::Timeout(address).class(), ErrorClass::Io);
        assert!(StorageError::Timeout(address).is_recoverable());
        assert_eq!(StorageError::AlreadyExists(address).class(), ErrorClass::Conflict);
        assert_eq!(
            StorageError::Block(BlockError::UnknownFormat(0)).class(),
            ErrorClass::ProtocolFormat
        );
        assert!(!StorageError::Block(BlockError::DecryptionFailed).is_recoverable());
    }
}
