//! Fire-and-forget transcript sink.
//!
//! `persist` snapshots the given history and hands the write to a detached
//! tokio task. The caller never waits on it and never sees its failure:
//! errors are logged with `tracing::warn!` and dropped.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use uuid::Uuid;
use vision_types::error::PersistenceError;
use vision_types::transcript::TranscriptSnapshot;
use vision_types::turn::Turn;

use super::blob_store::BoxBlobStore;

/// Longest session id fragment used inside a blob key.
const MAX_KEY_SESSION_LEN: usize = 128;

/// Mirrors completed exchanges to a blob store, off the request path.
///
/// Cloning is cheap; clones share the same store.
#[derive(Clone)]
pub struct PersistenceSink {
    store: Option<Arc<BoxBlobStore>>,
}

impl PersistenceSink {
    pub fn new(store: BoxBlobStore) -> Self {
        Self {
            store: Some(Arc::new(store)),
        }
    }

    /// A sink that drops every snapshot.
    pub fn disabled() -> Self {
        Self { store: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Write `history` for `session_id` in the background.
    ///
    /// Returns the spawned task so tests can await it; request handlers drop
    /// the handle, which detaches the task. Returns `None` when disabled.
    pub fn persist(&self, session_id: &str, history: Vec<Turn>) -> Option<JoinHandle<()>> {
        let Some(store) = self.store.clone() else {
            tracing::debug!(session_id = %session_id, "transcript persistence disabled, skipping");
            return None;
        };

        let snapshot = TranscriptSnapshot::new(session_id, history);
        Some(tokio::spawn(async move {
            let session_id = snapshot.session_id.clone();
            match write_snapshot(&store, snapshot).await {
                Ok(key) => {
                    tracing::debug!(session_id = %session_id, key = %key, store = store.name(), "transcript persisted");
                }
                Err(e) => {
                    tracing::warn!(session_id = %session_id, store = store.name(), error = %e, "transcript persistence failed");
                }
            }
        }))
    }
}

impl std::fmt::Debug for PersistenceSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceSink")
            .field("store", &self.store.as_ref().map(|s| s.name().to_string()))
            .finish()
    }
}

async fn write_snapshot(
    store: &BoxBlobStore,
    snapshot: TranscriptSnapshot,
) -> Result<String, PersistenceError> {
    let key = blob_key(&snapshot.session_id, snapshot.saved_at, Uuid::now_v7());
    let body = serde_json::to_vec_pretty(&snapshot)
        .map_err(|e| PersistenceError::Serialization(e.to_string()))?;
    store.put(&key, body).await?;
    Ok(key)
}

/// Build the blob key for one snapshot write.
///
/// Layout: `{session}/{YYYYMMDDTHHMMSS.ffffffZ}-{write_id}.json`. The write id
/// keeps keys unique even for two writes in the same microsecond.
pub fn blob_key(session_id: &str, saved_at: DateTime<Utc>, write_id: Uuid) -> String {
    format!(
        "{}/{}-{}.json",
        sanitize_session_id(session_id),
        saved_at.format("%Y%m%dT%H%M%S%.6fZ"),
        write_id.simple()
    )
}

/// Map a client-supplied session id onto `[A-Za-z0-9_-]`.
///
/// Distinct ids may sanitize to the same prefix; the snapshot body always
/// carries the original id.
pub fn sanitize_session_id(session_id: &str) -> String {
    let sanitized: String = session_id
        .chars()
        .take(MAX_KEY_SESSION_LEN)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() {
        "_".to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::memory::MemoryBlobStore;
    use chrono::TimeZone;

    #[test]
    fn sanitize_keeps_safe_characters() {
        assert_eq!(sanitize_session_id("web-12_abc"), "web-12_abc");
        assert_eq!(sanitize_session_id("../etc/passwd"), "___etc_passwd");
        assert_eq!(sanitize_session_id("caffè latte"), "caff__latte");
        assert_eq!(sanitize_session_id(""), "_");
    }

    #[test]
    fn sanitize_truncates_long_ids() {
        let long = "x".repeat(500);
        assert_eq!(sanitize_session_id(&long).len(), MAX_KEY_SESSION_LEN);
    }

    #[test]
    fn blob_key_layout() {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 5).unwrap();
        let id = Uuid::nil();
        assert_eq!(
            blob_key("s1", at, id),
            "s1/20261019T083005.000000Z-00000000000000000000000000000000.json"
        );
    }

    #[test]
    fn blob_keys_differ_within_same_instant() {
        let at = Utc::now();
        let a = blob_key("s1", at, Uuid::now_v7());
        let b = blob_key("s1", at, Uuid::now_v7());
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn persist_writes_full_history() {
        let memory = MemoryBlobStore::new();
        let sink = PersistenceSink::new(BoxBlobStore::new(memory.clone()));

        let history = vec![Turn::user("Hi"), Turn::assistant("Hello!")];
        sink.persist("s1", history.clone()).unwrap().await.unwrap();

        let keys = memory.keys();
        assert_eq!(keys.len(), 1);
        assert!(keys[0].starts_with("s1/"));
        assert!(keys[0].ends_with(".json"));

        let snapshot: TranscriptSnapshot =
            serde_json::from_slice(&memory.get(&keys[0]).unwrap()).unwrap();
        assert_eq!(snapshot.session_id, "s1");
        assert_eq!(snapshot.turn_count, 2);
        assert_eq!(snapshot.history, history);
    }

    #[tokio::test]
    async fn repeated_persists_append_new_blobs() {
        let memory = MemoryBlobStore::new();
        let sink = PersistenceSink::new(BoxBlobStore::new(memory.clone()));

        sink.persist("s1", vec![Turn::user("a")]).unwrap().await.unwrap();
        sink.persist("s1", vec![Turn::user("a"), Turn::assistant("b")])
            .unwrap()
            .await
            .unwrap();

        assert_eq!(memory.len(), 2);
    }

    #[tokio::test]
    async fn failing_store_is_swallowed() {
        let sink = PersistenceSink::new(BoxBlobStore::new(MemoryBlobStore::failing()));
        let handle = sink.persist("s1", vec![Turn::user("Hi")]).unwrap();
        // The task completes normally; the error never propagates.
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn disabled_sink_spawns_nothing() {
        let sink = PersistenceSink::disabled();
        assert!(!sink.is_enabled());
        assert!(sink.persist("s1", vec![Turn::user("Hi")]).is_none());
    }
}
