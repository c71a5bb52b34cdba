//! In-memory blob store for tests.

use std::sync::Arc;

use dashmap::DashMap;
use vision_types::error::PersistenceError;

use super::blob_store::BlobStore;

/// Records every write; optionally rejects all of them.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<DashMap<String, Vec<u8>>>,
    failing: bool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every `put` fails.
    pub fn failing() -> Self {
        Self {
            blobs: Arc::default(),
            failing: true,
        }
    }

    /// Keys written so far, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.blobs.iter().map(|r| r.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs.get(key).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), PersistenceError> {
        if self.failing {
            return Err(PersistenceError::StorageError(
                "memory store configured to fail".to_string(),
            ));
        }
        self.blobs.insert(key.to_string(), body);
        Ok(())
    }
}
