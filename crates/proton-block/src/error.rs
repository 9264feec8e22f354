use proton_crypto::CipherError;
use proton_types::{Address, ErrorClass, Family};

/// Errors from block binding, validation, encoding and sealing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockError {
    /// The encoding starts with a format tag this build does not know.
    #[error("unknown block format tag {0}")]
    UnknownFormat(u8),

    /// The encoding is empty; not even a format tag is present.
    #[error("empty block encoding")]
    Truncated,

    /// The body after the format tag does not deserialize.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The block binds to a different address than the one it was fetched under.
    #[error("address mismatch: expected {expected:?}, computed {computed:?}")]
    AddressMismatch { expected: Address, computed: Address },

    /// An owner or body signature does not verify.
    #[error("invalid signature on {0:?} block")]
    SignatureInvalid(Family),

    /// A mutable body does not carry one lineage link per earlier revision.
    #[error("revision {revision} carries {links} lineage links")]
    BrokenLineage { revision: u64, links: usize },

    /// The signing key handed in is not the block owner's.
    #[error("signing key does not own this block")]
    NotOwner,

    /// The secret does not open the sealed payload.
    #[error("decryption failed: wrong secret or corrupted block")]
    DecryptionFailed,

    /// Sealing the payload failed.
    #[error("encryption failed")]
    EncryptionFailed,

    /// The operation requires a different block family.
    #[error("expected a {expected} block, got {actual}")]
    WrongFamily {
        expected: &'static str,
        actual: Family,
    },
}

impl BlockError {
    /// The recoverability class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::UnknownFormat(_) | Self::Truncated | Self::Serialization(_) => {
                ErrorClass::ProtocolFormat
            }
            Self::AddressMismatch { .. } => ErrorClass::NotFound,
            Self::SignatureInvalid(_)
            | Self::BrokenLineage { .. }
            | Self::NotOwner
            | Self::DecryptionFailed
            | Self::EncryptionFailed
            | Self::WrongFamily { .. } => ErrorClass::Integrity,
        }
    }

    /// Whether a caller may recover from this error.
    pub fn is_recoverable(&self) -> bool {
        self.class().is_recoverable()
    }
}

impl From<CipherError> for BlockError {
    fn from(err: CipherError) -> Self {
        match err {
            CipherError::EncryptFailed => Self::EncryptionFailed,
            CipherError::DecryptFailed | CipherError::CiphertextTooShort => {
                Self::DecryptionFailed
            }
        }
    }
}

/// Result alias for block operations.
pub type BlockResult<T> = Result<T, BlockError>;
