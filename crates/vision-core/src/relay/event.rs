//! Values exchanged between the relay producer and its consumer.

use std::fmt;

/// One item of the client-facing stream.
///
/// A relay emits zero or more `Fragment`s, at most one `ErrorNotice`, and
/// exactly one `End`, always last. A consumer that disconnects early simply
/// stops receiving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// Reply text, forwarded verbatim in arrival order.
    Fragment(String),
    /// Generic failure notice shown to the client.
    ErrorNotice(String),
    /// Terminal sentinel.
    End,
}

impl RelayEvent {
    pub fn is_end(&self) -> bool {
        matches!(self, RelayEvent::End)
    }
}

/// Lifecycle of one streamed reply.
///
/// `Idle -> Streaming -> {Completed | Failed | Cancelled}`. Only `Completed`
/// commits the assistant turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

impl RelayState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RelayState::Completed | RelayState::Failed | RelayState::Cancelled
        )
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayState::Idle => write!(f, "idle"),
            RelayState::Streaming => write!(f, "streaming"),
            RelayState::Completed => write!(f, "completed"),
            RelayState::Failed => write!(f, "failed"),
            RelayState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// What the producer task reports once it has finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayOutcome {
    pub state: RelayState,
    /// Concatenation of every fragment relayed so far.
    pub text: String,
    /// Number of fragments relayed.
    pub fragments: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!RelayState::Idle.is_terminal());
        assert!(!RelayState::Streaming.is_terminal());
        assert!(RelayState::Completed.is_terminal());
        assert!(RelayState::Failed.is_terminal());
        assert!(RelayState::Cancelled.is_terminal());
    }

    #[test]
    fn state_display() {
        assert_eq!(RelayState::Cancelled.to_string(), "cancelled");
    }
}
