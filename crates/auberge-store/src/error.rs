use auberge_shared::{EntityId, TransportError};
use thiserror::Error;

/// Errors produced by the catalog store.
///
/// `Clone` because a shared revalidation hands its result to every waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The persistence API failed or rejected the request.
    #[error("Catalog request failed: {0}")]
    Transport(#[from] TransportError),

    /// A mutation named an entity that is not in the cached collection.
    #[error("Unknown entity: {0}")]
    UnknownEntity(EntityId),

    /// The mutation would break an entity invariant.
    #[error("Invalid entity: {0}")]
    InvalidEntity(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
