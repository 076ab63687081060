//! StateStore: redb-backed snapshot persistence for the controller.
//!
//! The whole controller state is JSON-serialized into a single row of the
//! `snapshots` table. Every `put_snapshot` replaces that row in one write
//! transaction, so a crash mid-write leaves the previous snapshot intact.
//! Both on-disk and in-memory backends are supported (the latter for
//! testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use corral_core::Snapshot;

use crate::error::{StateError, StateResult};
use crate::tables::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe snapshot store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent store at the given path.
    ///
    /// The parent directory is created if missing.
    pub fn open(path: &Path) -> StateResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(map_err!(Open))?;
        }
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        txn.open_table(SNAPSHOTS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Replace the persisted snapshot.
    pub fn put_snapshot(&self, snapshot: &Snapshot) -> StateResult<()> {
        let value = snapshot.to_vec().map_err(map_err!(Serialize))?;
        self.put_snapshot_bytes(&value)
    }

    /// Replace the persisted snapshot with an already-encoded document.
    pub fn put_snapshot_bytes(&self, value: &[u8]) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(SNAPSHOTS).map_err(map_err!(Table))?;
            table.insert(CURRENT, value).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(bytes = value.len(), "snapshot stored");
        Ok(())
    }

    /// Raw bytes of the persisted snapshot, if one was ever written.
    ///
    /// Decoding is left to the caller so a corrupt document surfaces as a
    /// deserialization error rather than a storage error.
    pub fn get_snapshot_bytes(&self) -> StateResult<Option<Vec<u8>>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(SNAPSHOTS).map_err(map_err!(Table))?;
        let value = table
            .get(CURRENT)
            .map_err(map_err!(Read))?
            .map(|guard| guard.value().to_vec());
        Ok(value)
    }

    /// Whether a snapshot has been persisted.
    pub fn has_snapshot(&self) -> StateResult<bool> {
        Ok(self.get_snapshot_bytes()?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corral_core::*;

    fn test_snapshot() -> Snapshot {
        let project = Project {
            name: "web".to_string(),
            configuration: ProjectConfiguration {
                image: "nginx".to_string(),
                count: 1,
                container_port: 80,
                host: "web.local".to_string(),
            },
        };
        let mut snapshot = Snapshot {
            projects: vec![project.clone()],
            nodes: vec![Node {
                id: "node-0".to_string(),
                address: "10.0.0.1".to_string(),
                api_port: 6060,
                labels: Vec::new(),
                healthy: true,
            }],
            ..Default::default()
        };
        snapshot.project_services.insert(
            "web".to_string(),
            vec![ServiceInstance {
                status: Status::Running,
                service: project.service_spec(),
                name: "web-0001".to_string(),
                id: "c0ffee".to_string(),
                exposed_port: 4321,
                node: "node-0".to_string(),
            }],
        );
        snapshot
    }

    #[test]
    fn empty_store_has_no_snapshot() {
        let store = StateStore::open_in_memory().unwrap();
        assert!(!store.has_snapshot().unwrap());
        assert!(store.get_snapshot_bytes().unwrap().is_none());
    }

    #[test]
    fn put_and_get_snapshot() {
        let store = StateStore::open_in_memory().unwrap();
        let snapshot = test_snapshot();
        store.put_snapshot(&snapshot).unwrap();

        let bytes = store.get_snapshot_bytes().unwrap().unwrap();
        assert_eq!(Snapshot::from_slice(&bytes).unwrap(), snapshot);
    }

    #[test]
    fn put_replaces_previous_snapshot() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_snapshot(&test_snapshot()).unwrap();
        store.put_snapshot(&Snapshot::default()).unwrap();

        let bytes = store.get_snapshot_bytes().unwrap().unwrap();
        assert_eq!(Snapshot::from_slice(&bytes).unwrap(), Snapshot::default());
    }

    #[test]
    fn corrupt_document_is_returned_raw() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_snapshot_bytes(b"garbage").unwrap();
        let bytes = store.get_snapshot_bytes().unwrap().unwrap();
        assert!(Snapshot::from_slice(&bytes).is_err());
    }

    #[test]
    fn persistent_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("corral.redb");

        {
            let store = StateStore::open(&path).unwrap();
            store.put_snapshot(&test_snapshot()).unwrap();
        }

        let store = StateStore::open(&path).unwrap();
        let bytes = store.get_snapshot_bytes().unwrap().unwrap();
        assert_eq!(Snapshot::from_slice(&bytes).unwrap(), test_snapshot());
    }
}
