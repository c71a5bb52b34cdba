//! LlmProvider trait definition.
//!
//! This is the core abstraction every inference backend implements.
//! Uses RPITIT for `complete`, and `Pin<Box<dyn Stream>>` for `stream`
//! (streams need to be object-safe for the BoxLlmProvider wrapper).

use std::pin::Pin;

use futures_util::Stream;

use vision_types::llm::{CompletionRequest, CompletionResponse, LlmError, StreamEvent};

/// Boxed event stream returned by [`LlmProvider::stream`].
pub type LlmStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;

/// Trait for inference backends (AWS Bedrock, test doubles, ...).
///
/// Implementations live in vision-infra (e.g., `BedrockProvider`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "bedrock").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full reply.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;

    /// Send a streaming completion request.
    ///
    /// The stream yields `TextDelta` fragments in order and terminates with
    /// `Done`. It may yield an `Err` at any point, including after fragments.
    /// Dropping the stream abandons the upstream call.
    fn stream(&self, request: CompletionRequest) -> LlmStream;
}
