//! Single-key blob persistence.
//!
//! The vault only needs `get(key)` / `set(key, bytes)` under the key
//! [`PROFILE_KEY`]. Two stores are provided:
//! - [`MemoryStore`] for tests and ephemeral use
//! - [`RedbStore`] backed by an embedded redb database file

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use redb::{Database, TableDefinition};

use crate::error::VaultResult;

/// Key under which the serialized profile is stored.
pub const PROFILE_KEY: &str = "profile";

const BLOBS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("blobs");

/// Opaque byte-blob store.
pub trait BlobStore: Send + Sync {
    fn get(&self, key: &str) -> VaultResult<Option<Vec<u8>>>;
    fn set(&self, key: &str, bytes: &[u8]) -> VaultResult<()>;
}

/// In-memory store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryStore {
    fn get(&self, key: &str) -> VaultResult<Option<Vec<u8>>> {
        Ok(self.blobs.read().get(key).cloned())
    }

    fn set(&self, key: &str, bytes: &[u8]) -> VaultResult<()> {
        self.blobs.write().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// Store backed by a redb database file.
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<RwLock<Database>>,
}

impl RedbStore {
    /// Open or create the database at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> VaultResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path)?;
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(BLOBS_TABLE)?;
        }
        write_txn.commit()?;

        tracing::debug!(path = %path.display(), "Opened blob store");
        Ok(Self {
            db: Arc::new(RwLock::new(db)),
        })
    }
}

impl BlobStore for RedbStore {
    fn get(&self, key: &str) -> VaultResult<Option<Vec<u8>>> {
        let db = self.db.read();
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(BLOBS_TABLE)?;
        Ok(table.get(key)?.map(|v| v.value().to_vec()))
    }

    fn set(&self, key: &str, bytes: &[u8]) -> VaultResult<()> {
        let db = self.db.read();
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(BLOBS_TABLE)?;
            table.insert(key, bytes)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}
