//! Error types for the persistence layer.
//!
//! All errors are propagated via [`StoreError`], which wraps the underlying
//! I/O and serialization errors and adds the store-specific cases a caller
//! is expected to branch on (missing factory, missing or malformed
//! identifier).

use robosim_types::FactoryId;

/// Errors that can occur while reading or writing stored factories.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No factory is stored under the requested identifier.
    #[error("no stored factory with id: {0}")]
    NotFound(FactoryId),

    /// The snapshot to persist carries an empty factory identifier.
    #[error("factory snapshot has no identifier")]
    MissingId,

    /// The factory identifier contains a path separator.
    #[error("factory id {0:?} contains a path separator")]
    InvalidId(String),

    /// A filesystem operation failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A snapshot could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
