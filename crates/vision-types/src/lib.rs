//! Shared domain types for Vision.
//!
//! This crate contains the core domain types used across the relay:
//! conversation turns, LLM request/response shapes, transcript snapshots,
//! configuration, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod config;
pub mod error;
pub mod llm;
pub mod transcript;
pub mod turn;
