//! Streaming relay between an inference stream and one client.

pub mod event;
pub mod stream_relay;

pub use event::{RelayEvent, RelayOutcome, RelayState};
pub use stream_relay::{
    RelayHandle, RelayOptions, RelayStream, StreamRelay, DEFAULT_ERROR_NOTICE,
};
