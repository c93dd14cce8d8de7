//! Server-Sent Events (SSE) processing for streaming chat completions.
//!
//! This module parses the `data:`-only event stream spoken by OpenAI-compatible
//! `chat/completions` endpoints, converting raw byte streams into structured
//! [`SseEvent`]s and, from those, into a stream of text fragments.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::observability::{STREAM_BYTES, STREAM_EVENTS};
use crate::types::ChatCompletionChunk;
use crate::{Error, Result};

/// Marker payload that terminates the stream.
const DONE_MARKER: &str = "[DONE]";

/// One parsed server-sent event.
#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent {
    /// A completion chunk.
    Chunk(ChatCompletionChunk),
    /// The `[DONE]` marker.
    Done,
}

/// Process a stream of bytes into a stream of server-sent events.
///
/// Comment lines and events without data are skipped.  The stream ends after
/// the `[DONE]` marker or when the byte stream ends, whichever comes first.
pub fn process_sse<S, E>(byte_stream: S) -> impl Stream<Item = Result<SseEvent>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    let state = SseState {
        buffer: String::new(),
        pending: Vec::new(),
        done: false,
    };

    stream::unfold((stream, state), move |(mut stream, mut state)| async move {
        if state.done {
            return None;
        }
        loop {
            while let Some((event, remaining)) = extract_event(&state.buffer) {
                state.buffer = remaining;
                if let Some(event) = event {
                    if matches!(event, Ok(SseEvent::Done)) {
                        state.done = true;
                    }
                    STREAM_EVENTS.click();
                    return Some((event, (stream, state)));
                }
            }

            match stream.next().await {
                Some(Ok(bytes)) => {
                    STREAM_BYTES.count(bytes.len() as u64);
                    if let Err(e) = state.push_bytes(&bytes) {
                        state.done = true;
                        return Some((Err(e), (stream, state)));
                    }
                }
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(e), (stream, state)));
                }
                None => {
                    state.done = true;
                    if !state.pending.is_empty() {
                        return Some((
                            Err(Error::encoding("stream ended inside a UTF-8 sequence", None)),
                            (stream, state),
                        ));
                    }
                    // A final event may arrive without its trailing blank line.
                    let tail = std::mem::take(&mut state.buffer);
                    if let Some((Some(event), _)) = extract_event(&format!("{tail}\n\n")) {
                        return Some((event, (stream, state)));
                    }
                    return None;
                }
            }
        }
    })
}

/// Reduce an event stream to its non-empty text fragments.
///
/// Chunks without content are skipped; errors pass through unchanged.
pub fn text_fragments<S>(events: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = Result<SseEvent>>,
{
    events.filter_map(|event| async move {
        match event {
            Ok(SseEvent::Chunk(chunk)) => chunk.fragment().map(|s| Ok(s.to_string())),
            Ok(SseEvent::Done) => None,
            Err(e) => Some(Err(e)),
        }
    })
}

struct SseState {
    buffer: String,
    pending: Vec<u8>,
    done: bool,
}

impl SseState {
    /// Append bytes, holding back a UTF-8 sequence split across network chunks.
    fn push_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.pending.extend_from_slice(bytes);
        let valid = match std::str::from_utf8(&self.pending) {
            Ok(text) => text.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(e) => return Err(e.into()),
        };
        let rest = self.pending.split_off(valid);
        let head = std::mem::replace(&mut self.pending, rest);
        self.buffer.push_str(std::str::from_utf8(&head)?);
        if self.buffer.contains('\r') {
            self.buffer = self.buffer.replace("\r\n", "\n");
        }
        Ok(())
    }
}

/// Extract a complete SSE event from a buffer string.
///
/// Returns `None` when no complete event is buffered.  The inner option is
/// `None` for events that carry no data (comments, keep-alives).
fn extract_event(buffer: &str) -> Option<(Option<Result<SseEvent>>, String)> {
    let (event_text, rest) = buffer.split_once("\n\n")?;
    let rest = rest.to_string();

    let mut data: Option<String> = None;
    for line in event_text.lines() {
        if line.starts_with(':') {
            continue;
        }
        if let Some(value) = line.strip_prefix("data:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            match data.as_mut() {
                Some(existing) => {
                    existing.push('\n');
                    existing.push_str(value);
                }
                None => data = Some(value.to_string()),
            }
        }
    }

    let Some(data) = data else {
        return Some((None, rest));
    };
    let data = data.trim();
    if data.is_empty() {
        return Some((None, rest));
    }
    if data == DONE_MARKER {
        return Some((Some(Ok(SseEvent::Done)), rest));
    }
    Some((Some(parse_chunk(data)), rest))
}

fn parse_chunk(data: &str) -> Result<SseEvent> {
    let chunk = serde_json::from_str::<ChatCompletionChunk>(data).map_err(|e| {
        Error::serialization(
            format!("Failed to parse event JSON: {e}"),
            Some(Box::new(e)),
        )
    })?;
    if let Some(error) = &chunk.error {
        return Err(Error::api(
            error.status().unwrap_or(500),
            error
                .error_type
                .clone()
                .or_else(|| Some("stream_error".to_string())),
            error.message.clone(),
        ));
    }
    Ok(SseEvent::Chunk(chunk))
}
