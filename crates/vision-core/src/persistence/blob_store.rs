//! Blob store trait and its type-erased wrapper.
//!
//! Same blanket-impl pattern as `BoxLlmProvider`.

use std::future::Future;
use std::pin::Pin;

use vision_types::error::PersistenceError;

/// Durable store accepting named payloads.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Implementations live in vision-infra.
pub trait BlobStore: Send + Sync {
    /// Short backend name for logs (e.g., "local").
    fn name(&self) -> &str;

    /// Write `body` under `key`, replacing nothing: keys are unique per write.
    fn put(
        &self,
        key: &str,
        body: Vec<u8>,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}

/// Object-safe version of [`BlobStore`].
pub trait BlobStoreDyn: Send + Sync {
    fn name(&self) -> &str;

    fn put_boxed<'a>(
        &'a self,
        key: &'a str,
        body: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<(), PersistenceError>> + Send + 'a>>;
}

impl<T: BlobStore> BlobStoreDyn for T {
    fn name(&self) -> &str {
        BlobStore::name(self)
    }

    fn put_boxed<'a>(
        &'a self,
        key: &'a str,
        body: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<(), PersistenceError>> + Send + 'a>> {
        Box::pin(self.put(key, body))
    }
}

/// Type-erased blob store.
pub struct BoxBlobStore {
    inner: Box<dyn BlobStoreDyn + Send + Sync>,
}

impl BoxBlobStore {
    pub fn new<T: BlobStore + 'static>(store: T) -> Self {
        Self {
            inner: Box::new(store),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), PersistenceError> {
        self.inner.put_boxed(key, body).await
    }
}
