use thiserror::Error;

/// Failures of the on-device store.
///
/// `StorageUnavailable` is fatal to the whole application; the others abort only
/// the operation that triggered them, leaving prior state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Local storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Invalid record: {0}")]
    Validation(String),
}

impl StoreError {
    pub(crate) fn write(err: impl std::fmt::Display) -> Self {
        StoreError::WriteFailed(format!("{:#}", err))
    }

    pub(crate) fn read(err: impl std::fmt::Display) -> Self {
        StoreError::ReadFailed(format!("{:#}", err))
    }

    pub(crate) fn unavailable(err: impl std::fmt::Display) -> Self {
        StoreError::StorageUnavailable(format!("{:#}", err))
    }
}
