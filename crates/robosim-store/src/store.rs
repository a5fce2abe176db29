//! The storage contract shared by every store backend.

use std::future::Future;

use robosim_types::{FactoryId, FactorySnapshot};

use crate::error::StoreError;

/// Keyed storage of factory snapshots.
///
/// A store holds at most one snapshot per [`FactoryId`] and replaces it
/// wholesale on persist. Implementations are shared across tasks: the
/// observer reads on prepare and writes on upload while simulations run,
/// so every operation takes `&self`.
pub trait FactoryStore: Send + Sync {
    /// Load the snapshot stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if nothing is stored under `id`.
    fn read(
        &self,
        id: &FactoryId,
    ) -> impl Future<Output = Result<FactorySnapshot, StoreError>> + Send;

    /// Store `snapshot` under its factory id, replacing any previous version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingId`] if the snapshot's identifier is
    /// empty or whitespace, and [`StoreError::InvalidId`] if it contains a
    /// path separator. Ids double as file names, so both backends enforce
    /// the same rule to stay interchangeable.
    fn persist(&self, snapshot: &FactorySnapshot)
    -> impl Future<Output = Result<(), StoreError>> + Send;

    /// List the ids of every stored factory, in ascending order.
    fn list(&self) -> impl Future<Output = Result<Vec<FactoryId>, StoreError>> + Send;
}
