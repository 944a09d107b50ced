use std::{
    collections::HashMap,
    io::ErrorKind,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use crate::{EngineError, ports::KeyValueStore};

/// Key-value store with one JSON file per key under a data directory.
#[derive(Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let dir = dir.into();
        if !dir.exists() {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|err| EngineError::Persistence(format!("Failed to create data directory {dir:?}: {err}")))?;
        }
        Ok(Self { dir })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, EngineError> {
        let path = self.key_path(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(EngineError::Persistence(format!("Failed to read {path:?}: {err}"))),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), EngineError> {
        let path = self.key_path(key);
        tokio::fs::write(&path, value)
            .await
            .map_err(|err| EngineError::Persistence(format!("Failed to write {path:?}: {err}")))
    }

    async fn delete(&self, key: &str) -> Result<(), EngineError> {
        let path = self.key_path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(EngineError::Persistence(format!("Failed to delete {path:?}: {err}"))),
        }
    }
}

/// In-memory store for tests and demos.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, EngineError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), EngineError> {
        self.entries.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), EngineError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_store_round_trip_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        assert_eq!(store.get("draft_trip").await.unwrap(), None);

        store.set("draft_trip", "{\"a\":1}".to_string()).await.unwrap();
        assert_eq!(store.get("draft_trip").await.unwrap().as_deref(), Some("{\"a\":1}"));

        store.delete("draft_trip").await.unwrap();
        assert_eq!(store.get("draft_trip").await.unwrap(), None);

        // Deleting an absent key is not an error.
        store.delete("draft_trip").await.unwrap();
    }
}
