//! Chat service orchestrating one conversational exchange.
//!
//! ChatService ties the session store, the inference provider, the stream
//! relay and the persistence sink together. Both entry points append the
//! user turn and read the model window in one step, so the window sent
//! upstream always ends with the turn this request added.

use std::sync::Arc;

use tracing::{info, warn};
use vision_types::llm::{CompletionRequest, LlmError, SamplingConfig};
use vision_types::turn::{Role, Turn};

use crate::llm::BoxLlmProvider;
use crate::persistence::PersistenceSink;
use crate::relay::{RelayHandle, RelayOptions, StreamRelay};
use crate::session::SessionStore;

/// Per-process settings applied to every inference call.
#[derive(Debug, Clone, Default)]
pub struct ChatSettings {
    pub system_prompt: Option<String>,
    pub sampling: SamplingConfig,
    pub relay: RelayOptions,
}

/// Orchestrates sync and streamed replies for any number of sessions.
///
/// Cheap to share behind an `Arc`; holds no per-request state.
#[derive(Debug)]
pub struct ChatService {
    store: Arc<SessionStore>,
    provider: Arc<BoxLlmProvider>,
    sink: PersistenceSink,
    relay: StreamRelay,
    system_prompt: Option<String>,
    sampling: SamplingConfig,
}

impl ChatService {
    pub fn new(
        store: Arc<SessionStore>,
        provider: BoxLlmProvider,
        sink: PersistenceSink,
        settings: ChatSettings,
    ) -> Self {
        let relay = StreamRelay::new(Arc::clone(&store), sink.clone(), settings.relay);
        Self {
            store,
            provider: Arc::new(provider),
            sink,
            relay,
            system_prompt: settings.system_prompt,
            sampling: settings.sampling,
        }
    }

    /// The session store backing this service.
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Whole-reply exchange.
    ///
    /// The user turn stays in history even when the provider fails; the
    /// assistant turn is appended only on success.
    pub async fn send_message(&self, session_id: &str, message: &str) -> Result<String, LlmError> {
        let window = self.store.append_and_window(session_id, Role::User, message);
        let request = self.build_request(window);

        let response = match self.provider.complete(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(session_id = %session_id, provider = self.provider.name(), error = %e, "completion failed");
                return Err(e);
            }
        };

        let history =
            self.store
                .append_and_history(session_id, Role::Assistant, response.content.clone());
        let _ = self.sink.persist(session_id, history);

        info!(
            session_id = %session_id,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            stop_reason = %response.stop_reason,
            "reply completed"
        );
        Ok(response.content)
    }

    /// Streamed exchange.
    ///
    /// Returns as soon as the relay is running; the assistant turn is
    /// committed by the relay once the provider finishes cleanly.
    pub fn stream_message(&self, session_id: &str, message: &str) -> RelayHandle {
        let window = self.store.append_and_window(session_id, Role::User, message);
        let upstream = self.provider.stream(self.build_request(window));
        self.relay.start(session_id, upstream)
    }

    fn build_request(&self, messages: Vec<Turn>) -> CompletionRequest {
        CompletionRequest {
            system: self.system_prompt.clone(),
            messages,
            sampling: self.sampling,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::StreamExt;

    use super::*;
    use crate::llm::mock::{ProviderProbe, ScriptedProvider};
    use crate::persistence::memory::MemoryBlobStore;
    use crate::persistence::BoxBlobStore;
    use crate::relay::{RelayEvent, RelayState};

    fn service(
        provider: ScriptedProvider,
        max_history: usize,
    ) -> (ChatService, ProviderProbe, MemoryBlobStore) {
        let probe = provider.probe();
        let memory = MemoryBlobStore::new();
        let service = ChatService::new(
            Arc::new(SessionStore::new(max_history)),
            BoxLlmProvider::new(provider),
            PersistenceSink::new(BoxBlobStore::new(memory.clone())),
            ChatSettings {
                system_prompt: Some("Sei un assistente.".to_string()),
                ..ChatSettings::default()
            },
        );
        (service, probe, memory)
    }

    #[tokio::test]
    async fn sync_exchange_records_both_turns() {
        let (service, probe, memory) = service(ScriptedProvider::replying(&["Hello!"]), 10);

        let reply = service.send_message("s1", "Hi").await.unwrap();

        assert_eq!(reply, "Hello!");
        assert_eq!(
            service.store().history("s1"),
            vec![Turn::user("Hi"), Turn::assistant("Hello!")]
        );
        let request = probe.last_request().unwrap();
        assert_eq!(request.messages, vec![Turn::user("Hi")]);
        assert_eq!(request.system.as_deref(), Some("Sei un assistente."));
        assert_eq!(request.sampling, SamplingConfig::default());

        for _ in 0..200 {
            if memory.len() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(memory.len(), 1);
    }

    #[tokio::test]
    async fn sync_failure_keeps_user_turn_only() {
        let (service, _, memory) =
            service(ScriptedProvider::replying(&["x"]).failing_after(0), 10);

        let err = service.send_message("s1", "Hi").await.unwrap_err();

        assert!(matches!(err, LlmError::Provider { .. }));
        assert_eq!(service.store().history("s1"), vec![Turn::user("Hi")]);
        assert!(memory.is_empty());
    }

    #[tokio::test]
    async fn window_is_bounded_suffix() {
        let (service, probe, _) = service(ScriptedProvider::replying(&["ok"]), 2);

        service.send_message("s1", "one").await.unwrap();
        service.send_message("s1", "two").await.unwrap();

        let request = probe.last_request().unwrap();
        assert_eq!(
            request.messages,
            vec![Turn::assistant("ok"), Turn::user("two")]
        );
        assert_eq!(service.store().len("s1"), 4);
    }

    #[tokio::test]
    async fn streamed_exchange_commits_on_done() {
        let (service, probe, _) = service(ScriptedProvider::replying(&["Hel", "lo!"]), 10);

        let (stream, task) = service.stream_message("s1", "Hi").into_parts();
        let events: Vec<RelayEvent> = stream.collect().await;
        let outcome = task.await.unwrap();

        assert_eq!(events.iter().filter(|e| e.is_end()).count(), 1);
        assert_eq!(outcome.state, RelayState::Completed);
        assert_eq!(probe.calls(), 1);
        assert_eq!(
            service.store().history("s1"),
            vec![Turn::user("Hi"), Turn::assistant("Hello!")]
        );
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let (service, _, _) = service(ScriptedProvider::replying(&["ok"]), 10);
        let service = Arc::new(service);

        let mut handles = Vec::new();
        for i in 0..8 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                let session = if i % 2 == 0 { "a" } else { "b" };
                service.send_message(session, &format!("m{i}")).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(service.store().len("a"), 8);
        assert_eq!(service.store().len("b"), 8);
        assert_eq!(service.store().session_count(), 2);
    }
}
