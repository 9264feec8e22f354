use proton_block::BlockError;
use proton_store::StorageError;
use proton_types::ErrorClass;

/// Recoverable and integrity errors from nest operations.
///
/// Misuse of the nest (unknown handles, transcribing while blocks are loaded)
/// panics instead.
#[derive(Debug, thiserror::Error)]
pub enum NestError {
    /// Storage refused or failed a load or a pre-publication.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A fetched block failed to validate or decrypt, or sealing failed.
    #[error(transparent)]
    Block(#[from] BlockError),
}

impl NestError {
    /// The recoverability class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Storage(e) => e.class(),
            Self::Block(e) => e.class(),
        }
    }

    /// Whether a caller may recover from this error.
    pub fn is_recoverable(&self) -> bool {
        self.class().is_recoverable()
    }
}

/// Result alias for nest operations.
pub type NestResult<T> = Result<T, NestError>;
