//! In-memory factory storage.
//!
//! Keeps snapshots in a process-local map with no durability. Used by the
//! API tests and by deployments that do not need factories to survive a
//! restart.

use std::collections::BTreeMap;

use robosim_types::{FactoryId, FactorySnapshot};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::FactoryStore;

/// Factory store backed by a shared map.
#[derive(Debug, Default)]
pub struct InMemoryFactoryStore {
    entries: RwLock<BTreeMap<FactoryId, FactorySnapshot>>,
}

impl InMemoryFactoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FactoryStore for InMemoryFactoryStore {
    async fn read(&self, id: &FactoryId) -> Result<FactorySnapshot, StoreError> {
        self.entries
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn persist(&self, snapshot: &FactorySnapshot) -> Result<(), StoreError> {
        let id = snapshot.id.as_str();
        if id.trim().is_empty() {
            return Err(StoreError::MissingId);
        }
        if id.contains(['/', '\\']) {
            return Err(StoreError::InvalidId(id.to_owned()));
        }
        self.entries
            .write()
            .await
            .insert(snapshot.id.clone(), snapshot.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<FactoryId>, StoreError> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}
