//! Durable storage seam.
//!
//! The store is partitioned into two logical buckets: `blocks` (block hash →
//! encoded block) and a metadata slot holding the encoded chain head. The
//! adapter is the only component allowed to touch durable state; everything
//! above it works with encoded bytes so implementations stay trivial.

use crate::error::StorageError;

/// Capability over the node's durable key-value store.
pub trait Storage: Send + Sync {
    /// Fetch an encoded block by hash, or `None` if absent.
    fn find_block(&self, hash: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Persist an encoded block under its hash.
    fn save_block(&self, hash: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Persist the encoded chain head.
    fn save_chain(&self, bytes: &[u8]) -> Result<(), StorageError>;

    /// Fetch the encoded chain head, or `None` on first boot.
    fn load_chain(&self) -> Result<Option<Vec<u8>>, StorageError>;

    /// Atomically drop every block. The bucket is either the old one or an
    /// empty new one, never partially populated.
    fn empty_blocks(&self) -> Result<(), StorageError>;
}

/// In-memory storage double for tests.
#[cfg(any(test, feature = "testing"))]
pub struct MemoryStorage {
    blocks: parking_lot::Mutex<std::collections::HashMap<String, Vec<u8>>>,
    chain: parking_lot::Mutex<Option<Vec<u8>>>,
}

#[cfg(any(test, feature = "testing"))]
impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            blocks: parking_lot::Mutex::new(std::collections::HashMap::new()),
            chain: parking_lot::Mutex::new(None),
        }
    }

    /// Number of stored blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.lock().len()
    }
}

#[cfg(any(test, feature = "testing"))]
impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "testing"))]
impl Storage for MemoryStorage {
    fn find_block(&self, hash: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.blocks.lock().get(hash).cloned())
    }

    fn save_block(&self, hash: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.blocks.lock().insert(hash.to_string(), bytes.to_vec());
        Ok(())
    }

    fn save_chain(&self, bytes: &[u8]) -> Result<(), StorageError> {
        *self.chain.lock() = Some(bytes.to_vec());
        Ok(())
    }

    fn load_chain(&self) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.chain.lock().clone())
    }

    fn empty_blocks(&self) -> Result<(), StorageError> {
        self.blocks.lock().clear();
        Ok(())
    }
}
