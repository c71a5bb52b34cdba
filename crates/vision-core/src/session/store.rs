//! Concurrent session store.
//!
//! Maps session ids to append-only turn histories. The outer `DashMap` is
//! only touched to look up or insert a session entry; every mutation of a
//! history happens under that session's own mutex, so unrelated sessions
//! never contend and appends to one session are applied one at a time.
//!
//! No guard is ever held across an `.await`: all operations are synchronous
//! and return owned copies.

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use vision_types::turn::{Role, Turn};

type History = Arc<Mutex<Vec<Turn>>>;

/// Single authoritative owner of all session histories.
///
/// Sessions are created implicitly on first append and live for the life of
/// the process. Role alternation is not validated; callers own that contract.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, History>,
    max_history_messages: usize,
}

impl SessionStore {
    /// Create an empty store whose model window holds at most
    /// `max_history_messages` turns.
    pub fn new(max_history_messages: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            max_history_messages,
        }
    }

    /// Size of the model window.
    pub fn max_history_messages(&self) -> usize {
        self.max_history_messages
    }

    /// Append a turn, creating the session if absent.
    ///
    /// Returns the history length after the append.
    pub fn append_turn(&self, session_id: &str, role: Role, text: impl Into<String>) -> usize {
        let turn = Turn::new(role, text);
        self.with_history_mut(session_id, |history| {
            history.push(turn);
            history.len()
        })
    }

    /// Last `max_history_messages` turns of the session, oldest first.
    ///
    /// Unknown sessions yield an empty window.
    pub fn window_for(&self, session_id: &str) -> Vec<Turn> {
        self.with_history(session_id, |history| self.window_of(history))
            .unwrap_or_default()
    }

    /// Append a turn and read the resulting window in one critical section.
    ///
    /// The returned window always ends with the appended turn, even when other
    /// requests are appending to the same session concurrently.
    pub fn append_and_window(
        &self,
        session_id: &str,
        role: Role,
        text: impl Into<String>,
    ) -> Vec<Turn> {
        let turn = Turn::new(role, text);
        self.with_history_mut(session_id, |history| {
            history.push(turn);
            self.window_of(history)
        })
    }

    /// Append a turn and return a copy of the full history including it.
    pub fn append_and_history(
        &self,
        session_id: &str,
        role: Role,
        text: impl Into<String>,
    ) -> Vec<Turn> {
        let turn = Turn::new(role, text);
        self.with_history_mut(session_id, |history| {
            history.push(turn);
            history.clone()
        })
    }

    /// Copy of the full history of a session.
    pub fn history(&self, session_id: &str) -> Vec<Turn> {
        self.with_history(session_id, |history| history.to_vec())
            .unwrap_or_default()
    }

    /// Number of turns recorded for a session.
    pub fn len(&self, session_id: &str) -> usize {
        self.with_history(session_id, |history| history.len())
            .unwrap_or(0)
    }

    /// Number of sessions seen since startup.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn window_of(&self, history: &[Turn]) -> Vec<Turn> {
        let start = history.len().saturating_sub(self.max_history_messages);
        history[start..].to_vec()
    }

    fn entry(&self, session_id: &str) -> History {
        if let Some(existing) = self.sessions.get(session_id) {
            return Arc::clone(existing.value());
        }
        Arc::clone(
            self.sessions
                .entry(session_id.to_string())
                .or_default()
                .value(),
        )
    }

    fn with_history_mut<R>(&self, session_id: &str, f: impl FnOnce(&mut Vec<Turn>) -> R) -> R {
        let entry = self.entry(session_id);
        let mut history = entry.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut history)
    }

    fn with_history<R>(&self, session_id: &str, f: impl FnOnce(&[Turn]) -> R) -> Option<R> {
        let entry = self
            .sessions
            .get(session_id)
            .map(|r| Arc::clone(r.value()))?;
        let history = entry.lock().unwrap_or_else(PoisonError::into_inner);
        Some(f(&history))
    }
}
