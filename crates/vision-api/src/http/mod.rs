//! HTTP layer for Vision.
//!
//! Axum router with a synchronous JSON endpoint, a server-sent-events
//! streaming endpoint, bearer-token authentication and CORS.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;
