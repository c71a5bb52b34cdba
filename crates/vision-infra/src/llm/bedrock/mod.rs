//! AWS Bedrock LLM provider implementation.
//!
//! Implements [`LlmProvider`](vision_core::llm::LlmProvider) for the Bedrock
//! Runtime Converse API, using Bearer token authentication and the AWS event
//! stream binary protocol.

mod client;
mod streaming;
pub mod types;

pub use client::BedrockProvider;
