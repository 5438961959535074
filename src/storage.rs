use crate::crypto::{Hash, hash_bytes};
use redb::{Database, TableDefinition};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object {0} not present in the store")]
    MissingObject(Hash),
    #[error("stored blob does not hash to its lookup key")]
    HashMismatch,
    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("database error: {0}")]
    Database(#[from] redb::Error),
}

/// Content-addressed blob store: every blob lives under its SHA-256 hash.
/// Blocks, tree nodes and encrypted entries all share one namespace.
pub trait ObjectStore: Send + Sync {
    fn get_raw(&self, key: &Hash) -> Result<Option<Vec<u8>>, StorageError>;
    fn put_raw(&self, key: &Hash, blob: &[u8]) -> Result<(), StorageError>;

    /// Store a blob under its content address and return the address.
    fn add(&self, blob: &[u8]) -> Result<Hash, StorageError> {
        let key = hash_bytes(blob);
        self.put_raw(&key, blob)?;
        Ok(key)
    }

    /// Fetch a blob, checking it still hashes to its lookup key.
    fn get(&self, key: &Hash) -> Result<Option<Vec<u8>>, StorageError> {
        match self.get_raw(key)? {
            Some(blob) => {
                if hash_bytes(&blob) != *key {
                    return Err(StorageError::HashMismatch);
                }
                Ok(Some(blob))
            }
            None => Ok(None),
        }
    }
}

// -----------------------------------------------------------------------------
// In-Memory Store (tests and short-lived chains)
// -----------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MemStore {
    objects: Arc<Mutex<HashMap<Hash, Vec<u8>>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy only the listed objects into a fresh store. Used to hand a
    /// verifier the minimal slice backing a piece of Merkle evidence.
    pub fn restrict(&self, keys: &BTreeSet<Hash>) -> MemStore {
        let objects = self.objects.lock().unwrap();
        let restricted: HashMap<Hash, Vec<u8>> = keys
            .iter()
            .filter_map(|k| objects.get(k).map(|v| (*k, v.clone())))
            .collect();
        MemStore {
            objects: Arc::new(Mutex::new(restricted)),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overwrite a blob in place without touching its key. Breaks the
    /// content-addressing invariant on purpose; only meaningful for
    /// tamper-detection tests.
    pub fn corrupt(&self, key: &Hash, blob: Vec<u8>) {
        self.objects.lock().unwrap().insert(*key, blob);
    }
}

impl ObjectStore for MemStore {
    fn get_raw(&self, key: &Hash) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.objects.lock().unwrap().get(key).cloned())
    }

    fn put_raw(&self, key: &Hash, blob: &[u8]) -> Result<(), StorageError> {
        self.objects.lock().unwrap().insert(*key, blob.to_vec());
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// redb Store (persistent chains)
// -----------------------------------------------------------------------------

const OBJECTS_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("objects");

pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = Database::create(path).map_err(redb::Error::from)?;
        // ensure the table exists so reads on a fresh database succeed
        let txn = db.begin_write().map_err(redb::Error::from)?;
        txn.open_table(OBJECTS_TABLE).map_err(redb::Error::from)?;
        txn.commit().map_err(redb::Error::from)?;
        Ok(Self { db })
    }
}

impl ObjectStore for RedbStore {
    fn get_raw(&self, key: &Hash) -> Result<Option<Vec<u8>>, StorageError> {
        let txn = self.db.begin_read().map_err(redb::Error::from)?;
        let table = txn.open_table(OBJECTS_TABLE).map_err(redb::Error::from)?;
        let value = table.get(key.0.as_slice()).map_err(redb::Error::from)?;
        Ok(value.map(|guard| guard.value().to_vec()))
    }

    fn put_raw(&self, key: &Hash, blob: &[u8]) -> Result<(), StorageError> {
        let txn = self.db.begin_write().map_err(redb::Error::from)?;
        {
            let mut table = txn.open_table(OBJECTS_TABLE).map_err(redb::Error::from)?;
            table
                .insert(key.0.as_slice(), blob)
                .map_err(redb::Error::from)?;
        }
        txn.commit().map_err(redb::Error::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_then_get() {
        let store = MemStore::new();
        let key = store.add(b"test blob").unwrap();
        assert_eq!(key, hash_bytes(b"test blob"));
        assert_eq!(store.get(&key).unwrap().unwrap(), b"test blob");
    }

    #[test]
    fn test_get_absent() {
        let store = MemStore::new();
        assert!(store.get(&hash_bytes(b"nothing")).unwrap().is_none());
    }

    #[test]
    fn test_get_detects_corruption() {
        let store = MemStore::new();
        let key = store.add(b"test blob").unwrap();
        store.corrupt(&key, b"other bytes".to_vec());
        assert!(matches!(store.get(&key), Err(StorageError::HashMismatch)));
    }

    #[test]
    fn test_restrict_keeps_only_listed_keys() {
        let store = MemStore::new();
        let kept = store.add(b"keep me").unwrap();
        let dropped = store.add(b"drop me").unwrap();

        let restricted = store.restrict(&BTreeSet::from([kept]));
        assert_eq!(restricted.len(), 1);
        assert!(restricted.get(&kept).unwrap().is_some());
        assert!(restricted.get(&dropped).unwrap().is_none());
    }
}
