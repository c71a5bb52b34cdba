//! Local filesystem blob store.
//!
//! Keys are relative, `/`-separated paths under a root directory:
//! ```text
//! {root}/
//!   web-42/
//!     20261019T083005.123456Z-0192a4....json
//!     20261019T083112.004211Z-0192a4....json
//! ```
//!
//! Each write lands in a temporary sibling first and is renamed into place,
//! so readers never observe a half-written snapshot.

use std::path::{Component, Path, PathBuf};

use uuid::Uuid;

use vision_core::persistence::BlobStore;
use vision_types::error::PersistenceError;

/// Blob store writing one file per key under `root`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `key` to a path inside the root.
    ///
    /// Rejects empty keys, absolute paths, and any `.`/`..` component.
    fn path_for(&self, key: &str) -> Result<PathBuf, PersistenceError> {
        if key.is_empty() || key.contains('\\') {
            return Err(PersistenceError::InvalidKey(key.to_string()));
        }
        let relative = Path::new(key);
        let all_normal = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !all_normal {
            return Err(PersistenceError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl BlobStore for LocalBlobStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), PersistenceError> {
        let path = self.path_for(key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_error(parent, e))?;
        }

        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(format!(".tmp-{}", Uuid::now_v7().simple()));
        let tmp_path = PathBuf::from(tmp_name);

        if let Err(e) = tokio::fs::write(&tmp_path, &body).await {
            return Err(storage_error(&tmp_path, e));
        }
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(storage_error(&path, e));
        }

        tracing::trace!(path = %path.display(), bytes = body.len(), "blob written");
        Ok(())
    }
}

fn storage_error(path: &Path, e: std::io::Error) -> PersistenceError {
    PersistenceError::StorageError(format!("{}: {e}", path.display()))
}
