//! Best-effort transcript mirroring.
//!
//! `BlobStore` is the port the durable store implements; `PersistenceSink`
//! snapshots a session's history and writes it on a detached task.

pub mod blob_store;
pub mod sink;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;

pub use blob_store::{BlobStore, BoxBlobStore};
pub use sink::{blob_key, sanitize_session_id, PersistenceSink};
