//! File-backed factory storage.
//!
//! Each factory is stored as one JSON document named `<id>.factory` under
//! the configured data directory. Persist replaces the whole file and read
//! parses the whole file, so the directory always mirrors the latest
//! persisted snapshot per factory and can be inspected with ordinary tools.

use std::path::{Path, PathBuf};

use robosim_types::{FactoryId, FactorySnapshot};

use crate::error::StoreError;
use crate::store::FactoryStore;

/// File name suffix that marks a stored factory snapshot.
const FACTORY_SUFFIX: &str = ".factory";

/// Factory store writing one JSON file per factory.
#[derive(Debug, Clone)]
pub struct FileFactoryStore {
    data_dir: PathBuf,
}

impl FileFactoryStore {
    /// Create a store rooted at `data_dir`.
    ///
    /// The directory is created on the first persist, so constructing a
    /// store never touches the filesystem.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Directory the store reads and writes.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn snapshot_path(&self, id: &FactoryId) -> PathBuf {
        self.data_dir
            .join(format!("{}{FACTORY_SUFFIX}", id.as_str()))
    }
}

impl FactoryStore for FileFactoryStore {
    async fn read(&self, id: &FactoryId) -> Result<FactorySnapshot, StoreError> {
        // A separator in the id would resolve outside the data directory.
        if id.as_str().contains(['/', '\\']) {
            return Err(StoreError::InvalidId(id.as_str().to_owned()));
        }
        let path = self.snapshot_path(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.clone()));
            }
            Err(error) => return Err(error.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn persist(&self, snapshot: &FactorySnapshot) -> Result<(), StoreError> {
        let id = snapshot.id.as_str();
        if id.trim().is_empty() {
            return Err(StoreError::MissingId);
        }
        if id.contains(['/', '\\']) {
            return Err(StoreError::InvalidId(id.to_owned()));
        }
        tokio::fs::create_dir_all(&self.data_dir).await?;
        let json = serde_json::to_vec_pretty(snapshot)?;
        tokio::fs::write(self.snapshot_path(&snapshot.id), json).await?;
        tracing::debug!(factory_id = %snapshot.id, "Persisted factory snapshot");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<FactoryId>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.data_dir).await {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Vec::new());
            }
            Err(error) => return Err(error.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if let Some(id) = name.strip_suffix(FACTORY_SUFFIX) {
                ids.push(FactoryId::new(id));
            }
        }
        // Directory iteration order is platform-dependent.
        ids.sort();
        Ok(ids)
    }
}
