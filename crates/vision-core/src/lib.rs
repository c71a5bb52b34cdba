//! Business logic and port trait definitions for Vision.
//!
//! This crate defines the "ports" (provider and blob store traits) that the
//! infrastructure layer implements, plus the session store and streaming
//! relay. It depends only on `vision-types` -- never on `vision-infra` or
//! any HTTP/IO crate.

pub mod chat;
pub mod llm;
pub mod persistence;
pub mod relay;
pub mod session;
