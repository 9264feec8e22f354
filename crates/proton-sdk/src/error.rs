use proton_block::BlockError;
use proton_journal::JournalError;
use proton_nest::NestError;
use proton_store::StorageError;
use proton_types::ErrorClass;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("background journal needs a tokio runtime")]
    NoRuntime,

    #[error(transparent)]
    Block(#[from] BlockError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Nest(#[from] NestError),

    #[error(transparent)]
    Journal(#[from] JournalError),
}

impl SdkError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Config(_) => ErrorClass::ProtocolFormat,
            Self::Io(_) | Self::NoRuntime => ErrorClass::Io,
            Self::Block(e) => e.class(),
            Self::Storage(e) => e.class(),
            Self::Nest(e) => e.class(),
            Self::Journal(e) => e.class(),
        }
    }

    pub fn is_recoverable(&self) -> bool {
        self.class().is_recoverable()
    }
}

pub type SdkResult<T> = Result<T, SdkError>;

#[cfg(test)]
mod tests {
    use super::*;
    use proton_types::Address;

    #[test]
    fn wrapped_errors_keep_their_class() {
        let err = SdkError::from(StorageError::Timeout(Address::null()));
        assert_eq!(err.class(), ErrorClass::Io);
        assert!(err.is_recoverable());

        let err = SdkError::from(NestError::from(StorageError::PendingDeletion(Address::null())));
        assert_eq!(err.class(), ErrorClass::NotFound);

        assert!(!SdkError::Config("bad".into()).is_recoverable());
    }
}
