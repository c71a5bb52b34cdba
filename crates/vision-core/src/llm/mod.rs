//! Inference backend abstractions for Vision.
//!
//! - `LlmProvider`: RPITIT trait for concrete provider implementations
//! - `BoxLlmProvider`: Object-safe wrapper for dynamic dispatch
//! - `mock`: scripted provider used by tests across the workspace

pub mod box_provider;
pub mod provider;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use box_provider::BoxLlmProvider;
pub use provider::{LlmProvider, LlmStream};
