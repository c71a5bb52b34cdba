//! AWS Bedrock event stream parser and async stream adapter.
//!
//! `converse-stream` answers with the AWS event stream binary protocol (not
//! SSE). Each frame has the layout:
//!
//! ```text
//! [total_len:4][headers_len:4][prelude_crc:4][headers...][payload...][msg_crc:4]
//! ```
//!
//! The `:event-type` header names the Converse event (`messageStart`,
//! `contentBlockDelta`, `contentBlockStop`, `messageStop`, `metadata`) and the
//! payload is that event's JSON. Frames whose `:message-type` is `exception`
//! carry an error instead.
//!
//! This module provides a minimal parser that extracts events without pulling
//! in the full AWS SDK.

use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};

use vision_core::llm::LlmStream;
use vision_types::llm::{LlmError, StopReason, StreamEvent, Usage};

use super::client::post_converse;
use super::types::{
    ContentBlockDeltaPayload, ConverseRequest, ExceptionPayload, MessageStopPayload,
    MetadataPayload,
};

/// Smallest well-formed frame: prelude plus message CRC.
const MIN_FRAME_LEN: usize = 16;

/// Internal state for the event stream state machine.
#[derive(Debug, Default)]
struct StreamState {
    /// A `messageStop` frame has been seen; the reply is complete.
    stop_seen: bool,
}

/// Parsed header from a binary event stream frame.
#[derive(Debug)]
struct EventHeader {
    name: String,
    value: String,
}

/// One decoded frame.
#[derive(Debug)]
struct Frame {
    headers: Vec<EventHeader>,
    payload: Vec<u8>,
}

impl Frame {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name == name)
            .map(|h| h.value.as_str())
    }
}

/// Parse binary headers from an AWS event stream frame.
///
/// Header format: `[name_len:1][name:N][type:1][value...]`. String (7) and
/// byte-array (6) values are length-prefixed; only strings are kept, every
/// other type is skipped by its fixed width.
fn parse_headers(mut buf: &[u8]) -> Vec<EventHeader> {
    let mut headers = Vec::new();
    while let Some((&name_len, rest)) = buf.split_first() {
        let name_len = name_len as usize;
        if rest.len() < name_len + 1 {
            break;
        }
        let name = String::from_utf8_lossy(&rest[..name_len]).to_string();
        let header_type = rest[name_len];
        buf = &rest[name_len + 1..];

        let value_width = match header_type {
            0 | 1 => 0,
            2 => 1,
            3 => 2,
            4 => 4,
            5 | 8 => 8,
            9 => 16,
            6 | 7 => {
                if buf.len() < 2 {
                    break;
                }
                let value_len = u16::from_be_bytes([buf[0], buf[1]]) as usize;
                buf = &buf[2..];
                if buf.len() < value_len {
                    break;
                }
                if header_type == 7 {
                    let value = String::from_utf8_lossy(&buf[..value_len]).to_string();
                    headers.push(EventHeader { name, value });
                }
                value_len
            }
            // Unknown type: its width cannot be known, stop here.
            _ => break,
        };
        if buf.len() < value_width {
            break;
        }
        buf = &buf[value_width..];
    }
    headers
}

/// Parse one binary event stream frame from the buffer.
///
/// Returns `Ok(Some((frame, bytes_consumed)))` on success, `Ok(None)` if the
/// buffer doesn't contain a complete frame yet, and `Err` when the prelude
/// describes an impossible frame.
fn parse_event_stream_frame(buf: &[u8]) -> Result<Option<(Frame, usize)>, LlmError> {
    if buf.len() < 12 {
        return Ok(None); // Need at least the prelude
    }

    let total_len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    let headers_len = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]) as usize;
    // bytes 8..12 = prelude CRC (skip)

    let headers_start = 12;
    let headers_end = headers_start + headers_len;
    if total_len < MIN_FRAME_LEN || headers_end > total_len - 4 {
        return Err(LlmError::Stream(format!(
            "malformed event stream frame (total {total_len}, headers {headers_len})"
        )));
    }

    if buf.len() < total_len {
        return Ok(None); // Incomplete frame
    }

    let payload_end = total_len - 4; // last 4 bytes = message CRC
    let frame = Frame {
        headers: parse_headers(&buf[headers_start..headers_end]),
        payload: buf[headers_end..payload_end].to_vec(),
    };
    Ok(Some((frame, total_len)))
}

/// Map a Bedrock exception name and message onto an [`LlmError`].
fn exception_error(exception_type: &str, message: String) -> LlmError {
    match exception_type {
        "throttlingException" => LlmError::RateLimited {
            retry_after_ms: None,
        },
        "accessDeniedException" => LlmError::AuthenticationFailed,
        "serviceUnavailableException" | "modelNotReadyException" => LlmError::Overloaded(message),
        "validationException" => LlmError::InvalidRequest(message),
        other => LlmError::Provider {
            message: format!("{other}: {message}"),
        },
    }
}

/// Turn one frame into zero or more `StreamEvent`s.
fn process_frame(frame: &Frame, state: &mut StreamState) -> Result<Vec<StreamEvent>, LlmError> {
    match frame.header(":message-type") {
        Some("exception") => {
            let exception_type = frame.header(":exception-type").unwrap_or("unknown");
            let message = serde_json::from_slice::<ExceptionPayload>(&frame.payload)
                .ok()
                .and_then(|p| p.message)
                .unwrap_or_default();
            Err(exception_error(exception_type, message))
        }
        Some("error") => Err(LlmError::Provider {
            message: format!(
                "{}: {}",
                frame.header(":error-code").unwrap_or("unknown"),
                frame.header(":error-message").unwrap_or_default()
            ),
        }),
        _ => process_converse_event(
            frame.header(":event-type").unwrap_or_default(),
            &frame.payload,
            state,
        ),
    }
}

/// Process a Converse event payload into zero or more `StreamEvent`s.
fn process_converse_event(
    event_type: &str,
    payload: &[u8],
    state: &mut StreamState,
) -> Result<Vec<StreamEvent>, LlmError> {
    let mut events = Vec::new();

    match event_type {
        "messageStart" | "contentBlockStart" | "contentBlockStop" => {}

        "contentBlockDelta" => {
            let payload: ContentBlockDeltaPayload = serde_json::from_slice(payload)
                .map_err(|e| LlmError::Deserialization(format!("contentBlockDelta: {e}")))?;
            if let Some(text) = payload.delta.text.filter(|t| !t.is_empty()) {
                events.push(StreamEvent::TextDelta { text });
            }
        }

        "messageStop" => {
            let payload: MessageStopPayload = serde_json::from_slice(payload)
                .map_err(|e| LlmError::Deserialization(format!("messageStop: {e}")))?;
            state.stop_seen = true;
            events.push(StreamEvent::MessageStop {
                stop_reason: StopReason::parse_lenient(payload.stop_reason.as_deref()),
            });
        }

        "metadata" => {
            let payload: MetadataPayload = serde_json::from_slice(payload)
                .map_err(|e| LlmError::Deserialization(format!("metadata: {e}")))?;
            if let Some(usage) = payload.usage {
                events.push(StreamEvent::Usage(Usage {
                    input_tokens: usage.input_tokens,
                    output_tokens: usage.output_tokens,
                }));
            }
        }

        "" => {
            // Keep-alive or headerless frame
        }

        unknown => {
            tracing::warn!(event_type = unknown, "unknown Bedrock event type, skipping");
        }
    }

    Ok(events)
}

/// Create a streaming connection to the Bedrock `converse-stream` action.
///
/// Sends the HTTP request, checks the response status, then reads the
/// binary event stream body. `Done` is yielded once the body ends after a
/// `messageStop` frame, so trailing `metadata` is still reported. A body that
/// ends without `messageStop` yields no `Done`.
pub fn create_converse_stream(
    client: &reqwest::Client,
    url: &str,
    body: ConverseRequest,
    api_key: &SecretString,
) -> LlmStream {
    let client = client.clone();
    let url = url.to_string();
    let api_key = SecretString::from(api_key.expose_secret().to_owned());

    Box::pin(async_stream::try_stream! {
        let response = post_converse(&client, &url, &api_key, &body).await?;

        yield StreamEvent::Connected;

        let mut byte_stream = response.bytes_stream();
        let mut buffer = Vec::new();
        let mut state = StreamState::default();

        while let Some(chunk_result) = byte_stream.next().await {
            let chunk = chunk_result.map_err(|e| LlmError::Stream(format!("response body read: {e}")))?;
            buffer.extend_from_slice(&chunk);

            // Parse as many complete frames as possible from the buffer
            while let Some((frame, consumed)) = parse_event_stream_frame(&buffer)? {
                buffer.drain(..consumed);
                for event in process_frame(&frame, &mut state)? {
                    yield event;
                }
            }
        }

        if !buffer.is_empty() {
            tracing::debug!(leftover = buffer.len(), "Bedrock stream ended mid-frame");
        }
        if state.stop_seen {
            yield StreamEvent::Done;
        }
    })
}
