//! Relays an upstream completion stream to one client.
//!
//! A producer task drains the provider stream into a bounded channel and the
//! consumer side ([`RelayStream`]) hands events to the transport. Dropping the
//! consumer cancels the producer, which drops the upstream stream and with it
//! the in-flight provider call. The assistant turn is committed only when the
//! provider signals `Done`; failures and disconnects leave history untouched.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::Instrument;
use vision_types::llm::{LlmError, StreamEvent};
use vision_types::turn::Role;

use super::event::{RelayEvent, RelayOutcome, RelayState};
use crate::llm::LlmStream;
use crate::persistence::PersistenceSink;
use crate::session::SessionStore;

/// Notice sent to clients when a streamed reply fails.
pub const DEFAULT_ERROR_NOTICE: &str = "Si è verificato un errore tecnico.";

/// Tuning for [`StreamRelay`].
#[derive(Debug, Clone)]
pub struct RelayOptions {
    /// Text of the `ErrorNotice` event. Never contains upstream details.
    pub error_notice: String,
    /// Events buffered between producer and consumer.
    pub buffer: usize,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            error_notice: DEFAULT_ERROR_NOTICE.to_string(),
            buffer: 32,
        }
    }
}

/// Starts relays against a shared session store.
#[derive(Debug, Clone)]
pub struct StreamRelay {
    store: Arc<SessionStore>,
    sink: PersistenceSink,
    options: RelayOptions,
}

/// Consumer half plus the producer task of one relay.
#[derive(Debug)]
pub struct RelayHandle {
    pub stream: RelayStream,
    pub task: JoinHandle<RelayOutcome>,
}

impl RelayHandle {
    pub fn into_parts(self) -> (RelayStream, JoinHandle<RelayOutcome>) {
        (self.stream, self.task)
    }
}

impl StreamRelay {
    pub fn new(store: Arc<SessionStore>, sink: PersistenceSink, options: RelayOptions) -> Self {
        Self {
            store,
            sink,
            options,
        }
    }

    /// Spawn the producer for `upstream` and return the client-facing stream.
    ///
    /// The caller must already have appended the user turn for `session_id`.
    pub fn start(&self, session_id: impl Into<String>, upstream: LlmStream) -> RelayHandle {
        let session_id = session_id.into();
        let (tx, rx) = mpsc::channel(self.options.buffer.max(1));
        let cancel = CancellationToken::new();

        let producer = Producer {
            store: Arc::clone(&self.store),
            sink: self.sink.clone(),
            error_notice: self.options.error_notice.clone(),
            session_id: session_id.clone(),
            tx,
            cancel: cancel.clone(),
            state: RelayState::Idle,
            text: String::new(),
            fragments: 0,
        };

        let span = tracing::info_span!("relay", session_id = %session_id);
        let task = tokio::spawn(producer.run(upstream).instrument(span));

        RelayHandle {
            stream: RelayStream {
                rx,
                _cancel_on_drop: cancel.drop_guard(),
            },
            task,
        }
    }
}

/// Client-facing event stream.
///
/// Ends after [`RelayEvent::End`], or without it when the relay was
/// cancelled. Dropping it cancels the relay.
#[derive(Debug)]
pub struct RelayStream {
    rx: mpsc::Receiver<RelayEvent>,
    _cancel_on_drop: DropGuard,
}

impl Stream for RelayStream {
    type Item = RelayEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

struct Producer {
    store: Arc<SessionStore>,
    sink: PersistenceSink,
    error_notice: String,
    session_id: String,
    tx: mpsc::Sender<RelayEvent>,
    cancel: CancellationToken,
    state: RelayState,
    text: String,
    fragments: usize,
}

impl Producer {
    async fn run(mut self, mut upstream: LlmStream) -> RelayOutcome {
        self.transition(RelayState::Streaming);

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return self.cancelled(),
                next = upstream.next() => next,
            };

            match next {
                Some(Ok(StreamEvent::TextDelta { text })) => {
                    if text.is_empty() {
                        continue;
                    }
                    self.text.push_str(&text);
                    self.fragments += 1;
                    if !self.send(RelayEvent::Fragment(text)).await {
                        return self.cancelled();
                    }
                }
                Some(Ok(StreamEvent::Done)) => return self.complete().await,
                Some(Ok(StreamEvent::MessageStop { stop_reason })) => {
                    tracing::debug!(stop_reason = %stop_reason, "upstream message stop");
                }
                Some(Ok(StreamEvent::Usage(usage))) => {
                    tracing::debug!(
                        input_tokens = usage.input_tokens,
                        output_tokens = usage.output_tokens,
                        "upstream usage"
                    );
                }
                Some(Ok(StreamEvent::Connected)) => {}
                Some(Err(e)) => return self.fail(e).await,
                None => return self.fail(LlmError::IncompleteStream).await,
            }
        }
    }

    async fn complete(mut self) -> RelayOutcome {
        let history = self
            .store
            .append_and_history(&self.session_id, Role::Assistant, self.text.clone());
        // Dropping the handle detaches the write.
        let _ = self.sink.persist(&self.session_id, history);

        self.transition(RelayState::Completed);
        tracing::info!(fragments = self.fragments, "streamed reply committed");
        self.send(RelayEvent::End).await;
        self.outcome()
    }

    async fn fail(mut self, error: LlmError) -> RelayOutcome {
        self.transition(RelayState::Failed);
        tracing::warn!(
            error = %error,
            fragments = self.fragments,
            "upstream stream failed, reply discarded"
        );
        let notice = RelayEvent::ErrorNotice(self.error_notice.clone());
        if self.send(notice).await {
            self.send(RelayEvent::End).await;
        }
        self.outcome()
    }

    fn cancelled(mut self) -> RelayOutcome {
        self.transition(RelayState::Cancelled);
        tracing::info!(fragments = self.fragments, "client disconnected, reply discarded");
        self.outcome()
    }

    /// Forward one event; `false` once the consumer is gone.
    async fn send(&self, event: RelayEvent) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.tx.send(event) => sent.is_ok(),
        }
    }

    fn transition(&mut self, next: RelayState) {
        tracing::trace!(from = %self.state, to = %next, "relay state");
        self.state = next;
    }

    fn outcome(self) -> RelayOutcome {
        RelayOutcome {
            state: self.state,
            text: self.text,
            fragments: self.fragments,
        }
    }
}
