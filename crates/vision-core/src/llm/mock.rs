//! Scripted provider for tests.
//!
//! Replays a fixed list of fragments and can be told to fail after a number
//! of fragments, end without the `Done` marker, or stall forever. A
//! [`ProviderProbe`] observes calls after the provider has been boxed.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use vision_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, StopReason, StreamEvent, Usage,
};

use super::provider::{LlmProvider, LlmStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ending {
    Done,
    FailAfter(usize),
    Truncate,
    Stall,
}

/// Shared view of what a [`ScriptedProvider`] has been asked to do.
#[derive(Debug, Clone, Default)]
pub struct ProviderProbe {
    calls: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<CompletionRequest>>>,
    stream_dropped: Arc<AtomicBool>,
}

impl ProviderProbe {
    /// Number of `complete` + `stream` invocations.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent request received.
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether the last upstream stream was dropped by its consumer.
    pub fn stream_dropped(&self) -> bool {
        self.stream_dropped.load(Ordering::SeqCst)
    }

    fn record(&self, request: &CompletionRequest) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(request.clone());
    }
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Provider that replays scripted fragments.
pub struct ScriptedProvider {
    fragments: Vec<String>,
    ending: Ending,
    probe: ProviderProbe,
}

impl ScriptedProvider {
    /// Reply with the given fragments, then end cleanly.
    pub fn replying(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|s| s.to_string()).collect(),
            ending: Ending::Done,
            probe: ProviderProbe::default(),
        }
    }

    /// Fail after emitting `k` fragments (sync calls fail immediately).
    pub fn failing_after(mut self, k: usize) -> Self {
        self.ending = Ending::FailAfter(k);
        self
    }

    /// End the stream without the `Done` marker.
    pub fn truncated(mut self) -> Self {
        self.ending = Ending::Truncate;
        self
    }

    /// Emit every fragment and then never finish.
    pub fn stalling(mut self) -> Self {
        self.ending = Ending::Stall;
        self
    }

    /// Handle for observing calls once the provider is boxed.
    pub fn probe(&self) -> ProviderProbe {
        self.probe.clone()
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.probe.record(request);
        match self.ending {
            Ending::FailAfter(_) => Err(LlmError::Provider {
                message: "scripted failure".to_string(),
            }),
            _ => Ok(CompletionResponse {
                content: self.fragments.concat(),
                stop_reason: StopReason::EndTurn,
                usage: Usage::default(),
            }),
        }
    }

    fn stream(&self, request: CompletionRequest) -> LlmStream {
        self.probe.record(&request);
        self.probe.stream_dropped.store(false, Ordering::SeqCst);

        let fragments = self.fragments.clone();
        let ending = self.ending;
        let flag = DropFlag(Arc::clone(&self.probe.stream_dropped));

        Box::pin(async_stream::stream! {
            let _flag = flag;
            yield Ok(StreamEvent::Connected);
            for (i, text) in fragments.into_iter().enumerate() {
                if ending == Ending::FailAfter(i) {
                    yield Err(LlmError::Stream("scripted mid-stream failure".to_string()));
                    return;
                }
                yield Ok(StreamEvent::TextDelta { text });
            }
            match ending {
                Ending::Done => {
                    yield Ok(StreamEvent::MessageStop { stop_reason: StopReason::EndTurn });
                    yield Ok(StreamEvent::Done);
                }
                Ending::FailAfter(_) => {
                    yield Err(LlmError::Stream("scripted failure".to_string()));
                }
                Ending::Truncate => {}
                Ending::Stall => {
                    futures_util::future::pending::<()>().await;
                }
            }
        })
    }
}
