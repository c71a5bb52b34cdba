//! Observability for Vision: tracing subscriber setup and the attribute
//! values recorded on request spans.

pub mod genai_attrs;
pub mod tracing_setup;
