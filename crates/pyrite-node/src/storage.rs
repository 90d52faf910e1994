//! RocksDB-backed storage adapter.
//!
//! One database per node (`blockchain_{port}.db`), two column families:
//! `blocks` (block hash → encoded block) and `data` (single `metadata` key
//! holding the encoded chain head). The wipe in [`Storage::empty_blocks`]
//! goes through a single [`WriteBatch`] so the bucket is never observed
//! partially emptied.

use std::path::Path;

use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};

use pyrite_core::error::StorageError;
use pyrite_core::storage::Storage;

const CF_BLOCKS: &str = "blocks";
const CF_DATA: &str = "data";

const DATA_KEY: &[u8] = b"metadata";

/// Durable store for one node.
pub struct RocksStore {
    db: DB,
}

impl RocksStore {
    /// Open or create the database at `path`, creating both column families.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_BLOCKS, Options::default()),
            ColumnFamilyDescriptor::new(CF_DATA, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path.as_ref(), cf_descriptors)
            .map_err(|e| StorageError(e.to_string()))?;
        Ok(Self { db })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily, StorageError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError(format!("missing column family: {name}")))
    }
}

impl Storage for RocksStore {
    fn find_block(&self, hash: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let cf = self.cf(CF_BLOCKS)?;
        self.db
            .get_cf(&cf, hash.as_bytes())
            .map_err(|e| StorageError(e.to_string()))
    }

    fn save_block(&self, hash: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let cf = self.cf(CF_BLOCKS)?;
        self.db
            .put_cf(&cf, hash.as_bytes(), bytes)
            .map_err(|e| StorageError(e.to_string()))
    }

    fn save_chain(&self, bytes: &[u8]) -> Result<(), StorageError> {
        let cf = self.cf(CF_DATA)?;
        self.db
            .put_cf(&cf, DATA_KEY, bytes)
            .map_err(|e| StorageError(e.to_string()))
    }

    fn load_chain(&self) -> Result<Option<Vec<u8>>, StorageError> {
        let cf = self.cf(CF_DATA)?;
        self.db
            .get_cf(&cf, DATA_KEY)
            .map_err(|e| StorageError(e.to_string()))
    }

    fn empty_blocks(&self) -> Result<(), StorageError> {
        let cf = self.cf(CF_BLOCKS)?;
        let mut batch = WriteBatch::default();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (key, _) = item.map_err(|e| StorageError(e.to_string()))?;
            batch.delete_cf(&cf, key);
        }
        self.db
            .write(batch)
            .map_err(|e| StorageError(e.to_string()))
    }
}
