//! Durable snapshot storage.
//!
//! The engine exports its state as a [`StoreSnapshot`]; this module owns
//! getting that document safely on and off disk. The session saves after
//! every mutation, so the snapshot on disk is never more than one
//! mutation behind the in-memory store.

use async_trait::async_trait;
use hearth_engine::StoreSnapshot;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt snapshot: {0}")]
    Corrupt(#[from] hearth_engine::Error),
}

/// Where session snapshots live.
#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    /// Load the persisted snapshot, `None` when nothing was saved yet.
    async fn load(&self) -> Result<Option<StoreSnapshot>, StorageError>;

    /// Persist a snapshot, replacing any previous one.
    async fn save(&self, snapshot: &StoreSnapshot) -> Result<(), StorageError>;
}

/// File-backed storage.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut path = self.path.clone();
        path.set_extension("tmp");
        path
    }
}

#[async_trait]
impl SnapshotStorage for FileStorage {
    async fn load(&self) -> Result<Option<StoreSnapshot>, StorageError> {
        let json = match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(StoreSnapshot::from_json(&json)?))
    }

    async fn save(&self, snapshot: &StoreSnapshot) -> Result<(), StorageError> {
        let json = snapshot.to_json()?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, json.as_bytes()).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }
}

/// In-memory storage for tests and ephemeral sessions.
///
/// Stores the serialized document, so load/save exercise the same
/// round-trip as real storage. Cloning shares the underlying slot, which
/// lets a test hand the "same disk" to a second session.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStorage for MemoryStorage {
    async fn load(&self) -> Result<Option<StoreSnapshot>, StorageError> {
        let slot = self.slot.lock().await;
        match slot.as_deref() {
            Some(json) => Ok(Some(StoreSnapshot::from_json(json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, snapshot: &StoreSnapshot) -> Result<(), StorageError> {
        let json = snapshot.to_json()?;
        *self.slot.lock().await = Some(json);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_engine::{OfflineRecord, TransactionFields};
    use chrono::NaiveDate;

    fn snapshot() -> StoreSnapshot {
        let mut snapshot = StoreSnapshot::new("hh-1");
        snapshot.add_record(OfflineRecord::new_local(
            "local-1",
            TransactionFields {
                date: NaiveDate::from_ymd_opt(2026, 8, 3).unwrap(),
                amount_minor: -5000,
                currency: "USD".into(),
                category: None,
                note: None,
            },
            1000,
        ));
        snapshot
    }

    #[tokio::test]
    async fn memory_roundtrip() {
        let storage = MemoryStorage::new();
        assert!(storage.load().await.unwrap().is_none());

        storage.save(&snapshot()).await.unwrap();
        let loaded = storage.load().await.unwrap().unwrap();
        assert_eq!(loaded, snapshot());
    }

    #[tokio::test]
    async fn memory_clone_shares_slot() {
        let storage = MemoryStorage::new();
        let other = storage.clone();
        storage.save(&snapshot()).await.unwrap();
        assert!(other.load().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("hearth.json"));

        assert!(storage.load().await.unwrap().is_none());
        storage.save(&snapshot()).await.unwrap();
        let loaded = storage.load().await.unwrap().unwrap();
        assert_eq!(loaded, snapshot());

        // no temp file left behind
        assert!(!storage.temp_path().exists());
    }

    #[tokio::test]
    async fn file_overwrite_replaces_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("hearth.json"));

        storage.save(&snapshot()).await.unwrap();
        let mut second = snapshot();
        second.add_record(OfflineRecord::new_local(
            "local-2",
            TransactionFields {
                date: NaiveDate::from_ymd_opt(2026, 8, 4).unwrap(),
                amount_minor: -100,
                currency: "USD".into(),
                category: None,
                note: None,
            },
            2000,
        ));
        storage.save(&second).await.unwrap();

        let loaded = storage.load().await.unwrap().unwrap();
        assert_eq!(loaded.record_count(), 2);
    }

    #[tokio::test]
    async fn file_corrupt_snapshot_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hearth.json");
        tokio::fs::write(&path, b"{broken").await.unwrap();

        let storage = FileStorage::new(path);
        assert!(matches!(
            storage.load().await,
            Err(StorageError::Corrupt(_))
        ));
    }
}
