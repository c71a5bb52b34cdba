//! In-memory session state.
//!
//! [`store::SessionStore`] is the single owner of every session history.

pub mod store;

pub use store::SessionStore;
