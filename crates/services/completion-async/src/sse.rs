//! Server-Sent Events decoding for streamed chat completions.

use std::collections::VecDeque;
use std::pin::Pin;

use futures::{Stream, StreamExt};

use crate::error::{CompletionError, map_deser, parse_error_envelope};
use crate::types::ChatCompletionChunk;

/// Stream of decoded chunks; ends after `[DONE]` or when the body closes
pub type ChunkStream =
    Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk, CompletionError>> + Send + 'static>>;

/// Terminal sentinel sent by OpenAI-compatible gateways
pub const DONE_SENTINEL: &str = "[DONE]";

/// Raw SSE frame with optional event type and data payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    /// Event type (from `event:` line)
    pub event: Option<String>,
    /// Data payload, multiple `data:` lines joined with `\n`
    pub data: String,
}

/// Incremental SSE parser
///
/// Buffers raw bytes so a multi-byte character split across network chunks
/// is decoded intact. Comment lines (`: keep-alive`) and unknown fields are
/// ignored.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    current: SseFrame,
}

impl SseDecoder {
    /// Create a new decoder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a chunk of bytes and return any complete frames
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            let line = line.trim_end_matches('\r');

            if line.is_empty() {
                if let Some(frame) = self.take_frame() {
                    frames.push(frame);
                }
            } else {
                self.apply_line(line);
            }
        }
        frames
    }

    /// Flush any remaining data as a final frame
    pub fn flush(&mut self) -> Option<SseFrame> {
        if !self.buffer.is_empty() {
            let raw = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&raw);
            self.apply_line(line.trim_end_matches('\r'));
        }
        self.take_frame()
    }

    fn apply_line(&mut self, line: &str) {
        if let Some(value) = line.strip_prefix("event:") {
            self.current.event = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("data:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            if !self.current.data.is_empty() {
                self.current.data.push('\n');
            }
            self.current.data.push_str(value);
        }
    }

    fn take_frame(&mut self) -> Option<SseFrame> {
        if self.current.event.is_some() || !self.current.data.is_empty() {
            Some(std::mem::take(&mut self.current))
        } else {
            None
        }
    }
}

/// What a single frame means for the stream
#[derive(Debug)]
pub enum FrameOutcome {
    /// A content chunk
    Chunk(ChatCompletionChunk),
    /// `[DONE]`
    Done,
    /// Nothing to emit (empty data)
    Skip,
}

/// Interpret one frame
///
/// # Errors
///
/// In-stream `{"error": {...}}` payloads become [`CompletionError::Api`] with no
/// status code; undecodable payloads become [`CompletionError::Serde`].
pub fn parse_frame(frame: &SseFrame) -> Result<FrameOutcome, CompletionError> {
    let data = frame.data.trim();
    if data.is_empty() {
        return Ok(FrameOutcome::Skip);
    }
    if data == DONE_SENTINEL {
        return Ok(FrameOutcome::Done);
    }
    if let Some(err) = parse_error_envelope(data.as_bytes()) {
        return Err(CompletionError::Api(err));
    }
    serde_json::from_str::<ChatCompletionChunk>(data)
        .map(FrameOutcome::Chunk)
        .map_err(|e| map_deser(&e, data.as_bytes()))
}

struct StreamState<S> {
    bytes: S,
    decoder: SseDecoder,
    pending: VecDeque<SseFrame>,
    finished: bool,
}

/// Turn a streaming response body into decoded chunks
///
/// The stream owns the response and closes the connection when dropped.
#[must_use]
pub fn chunk_stream_from_response(response: reqwest::Response) -> ChunkStream {
    chunk_stream_from_bytes(response.bytes_stream())
}

/// Decode an arbitrary byte stream; split out from the response variant for tests
pub fn chunk_stream_from_bytes<S, B, E>(bytes: S) -> ChunkStream
where
    S: Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<CompletionError> + Send + 'static,
{
    let state = StreamState {
        bytes,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(futures::stream::unfold(state, |mut st| async move {
        if st.finished {
            return None;
        }
        loop {
            while let Some(frame) = st.pending.pop_front() {
                match parse_frame(&frame) {
                    Ok(FrameOutcome::Chunk(chunk)) => return Some((Ok(chunk), st)),
                    Ok(FrameOutcome::Skip) => {}
                    Ok(FrameOutcome::Done) => return None,
                    Err(e) => {
                        st.finished = true;
                        return Some((Err(e), st));
                    }
                }
            }

            match st.bytes.next().await {
                Some(Ok(chunk)) => st.pending.extend(st.decoder.push(chunk.as_ref())),
                Some(Err(e)) => {
                    st.finished = true;
                    return Some((Err(e.into()), st));
                }
                None => match st.decoder.flush() {
                    Some(frame) => {
                        st.finished = true;
                        return match parse_frame(&frame) {
                            Ok(FrameOutcome::Chunk(chunk)) => Some((Ok(chunk), st)),
                            Ok(FrameOutcome::Done | FrameOutcome::Skip) => None,
                            Err(e) => Some((Err(e), st)),
                        };
                    }
                    None => return None,
                },
            }
        }
    }))
}
