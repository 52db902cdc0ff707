//! Durable storage for backpack contents.

use crate::models::BackpackData;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("backpack store lock was poisoned")]
    LockPoisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Loads and saves the whole [`BackpackData`] under a store name.
pub trait BackpackRepository: Send + Sync {
    /// Load the store. A store that was never written loads as empty.
    fn load(&self, name: &str) -> Result<BackpackData>;

    /// Replace the store with `data`.
    fn save(&self, name: &str, data: &BackpackData) -> Result<()>;
}

/// Stores each named store as a JSON file in a directory.
pub struct FileBackpackRepository {
    base_dir: PathBuf,
}

impl FileBackpackRepository {
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn store_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", name))
    }
}

impl BackpackRepository for FileBackpackRepository {
    fn load(&self, name: &str) -> Result<BackpackData> {
        let path = self.store_path(name);

        if !path.exists() {
            tracing::debug!("No store at {}, starting empty", path.display());
            return Ok(BackpackData::default());
        }

        let bytes = fs::read(&path)?;
        let data: BackpackData = serde_json::from_slice(&bytes)?;

        tracing::debug!(
            "Loaded {} backpacks from {}",
            data.players.len(),
            path.display()
        );

        Ok(data)
    }

    fn save(&self, name: &str, data: &BackpackData) -> Result<()> {
        let path = self.store_path(name);
        let temp_path = path.with_extension("json.tmp");

        let bytes = serde_json::to_vec_pretty(data)?;
        fs::write(&temp_path, bytes)?;
        fs::rename(&temp_path, &path)?;

        tracing::debug!("Saved {} backpacks to {}", data.players.len(), path.display());

        Ok(())
    }
}

/// Keeps stores in memory. Used by tests and throwaway servers.
#[derive(Default)]
pub struct InMemoryBackpackRepository {
    stores: RwLock<HashMap<String, BackpackData>>,
}

impl InMemoryBackpackRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(name: &str, data: BackpackData) -> Self {
        let mut stores = HashMap::new();
        stores.insert(name.to_string(), data);
        Self {
            stores: RwLock::new(stores),
        }
    }
}

impl BackpackRepository for InMemoryBackpackRepository {
    fn load(&self, name: &str) -> Result<BackpackData> {
        let stores = self.stores.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(stores.get(name).cloned().unwrap_or_default())
    }

    fn save(&self, name: &str, data: &BackpackData) -> Result<()> {
        let mut stores = self.stores.write().map_err(|_| StorageError::LockPoisoned)?;
        stores.insert(name.to_string(), data.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemRecord;

    fn sample() -> BackpackData {
        let mut data = BackpackData::default();
        data.find_items_by_id(76561198000000001).extend([
            ItemRecord::new("wood", 0, 100),
            ItemRecord::new("rifle.ak", 1234, 1),
        ]);
        data
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileBackpackRepository::new(dir.path()).unwrap();
        repo.save("Backpacks", &sample()).unwrap();

        let reopened = FileBackpackRepository::new(dir.path()).unwrap();
        assert_eq!(reopened.load("Backpacks").unwrap(), sample());
        assert!(!dir.path().join("Backpacks.json.tmp").exists());
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileBackpackRepository::new(dir.path().join("nested")).unwrap();
        assert_eq!(repo.load("Backpacks").unwrap(), BackpackData::default());
    }

    #[test]
    fn corrupted_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Backpacks.json"), b"{ not json").unwrap();
        let repo = FileBackpackRepository::new(dir.path()).unwrap();
        assert!(matches!(repo.load("Backpacks"), Err(StorageError::Json(_))));
    }

    #[test]
    fn in_memory_store_keeps_names_apart() {
        let repo = InMemoryBackpackRepository::with_store("a", sample());
        assert_eq!(repo.load("a").unwrap(), sample());
        assert_eq!(repo.load("b").unwrap(), BackpackData::default());

        repo.save("a", &BackpackData::default()).unwrap();
        assert!(repo.load("a").unwrap().players.is_empty());
    }
}
