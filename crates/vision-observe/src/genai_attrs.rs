//! OpenTelemetry GenAI Semantic Convention values.
//!
//! Request spans carry these fields (dotted names are written inline in the
//! `tracing` macros, since field names must be literals):
//!
//! - `gen_ai.operation.name`: one of the `OP_*` values below
//! - `gen_ai.provider.name`: the inference provider's own name
//! - `vision.session.id`: the client-supplied session id
//! - `vision.transport`: one of the `TRANSPORT_*` values below
//!
//! Span naming convention: `"{operation}"` (e.g., `"chat"`).

// --- Operation name values ---

/// Chat completion, used for both the sync and the streamed path.
pub const OP_CHAT: &str = "chat";

// --- Transport values ---

/// Whole reply returned in one JSON body.
pub const TRANSPORT_SYNC: &str = "sync";

/// Reply relayed as server-sent events.
pub const TRANSPORT_SSE: &str = "sse";
