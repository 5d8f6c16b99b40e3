use auberge_shared::{MimeClass, TransportError};
use auberge_store::StoreError;
use thiserror::Error;

/// An asset rejected before any network call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{kind} uploads are not allowed here")]
    KindNotAllowed { kind: MimeClass },

    #[error("File too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("Unsupported file type: {0}")]
    UnknownType(String),

    #[error("File is empty")]
    Empty,
}

/// Errors surfaced to the UI layer.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Upload failed: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Upload aborted")]
    Aborted,
}

pub type Result<T> = std::result::Result<T, ClientError>;
