//! Transcript snapshot written to the durable blob store.
//!
//! One snapshot is produced per completed exchange. It is an audit trail,
//! never read back by the relay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::turn::Turn;

/// Full ordered history of one session at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSnapshot {
    pub session_id: String,
    pub saved_at: DateTime<Utc>,
    pub turn_count: usize,
    pub history: Vec<Turn>,
}

impl TranscriptSnapshot {
    pub fn new(session_id: impl Into<String>, history: Vec<Turn>) -> Self {
        Self {
            session_id: session_id.into(),
            saved_at: Utc::now(),
            turn_count: history.len(),
            history,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts_turns() {
        let snapshot =
            TranscriptSnapshot::new("s1", vec![Turn::user("Hi"), Turn::assistant("Hello!")]);
        assert_eq!(snapshot.turn_count, 2);
        assert_eq!(snapshot.session_id, "s1");
    }

    #[test]
    fn test_snapshot_json_is_human_readable() {
        let snapshot = TranscriptSnapshot::new("s1", vec![Turn::user("Hi")]);
        let json = serde_json::to_string_pretty(&snapshot).unwrap();
        assert!(json.contains("\"session_id\": \"s1\""));
        assert!(json.contains("\"role\": \"user\""));
        assert!(json.contains("\"saved_at\""));
    }
}
