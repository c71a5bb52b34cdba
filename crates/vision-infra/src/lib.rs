//! Infrastructure layer for Vision.
//!
//! Contains the implementations of the port traits defined in `vision-core`:
//! the AWS Bedrock inference provider, the local filesystem blob store, and
//! the layered configuration loader.

pub mod config;
pub mod llm;
pub mod storage;
