use crate::errors::ClientError;
use crate::event::{ErrorPayload, FinalEnvelope, StatusUpdate, StreamEvent};

/// One dispatched `text/event-stream` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

impl SseFrame {
    /// Event name, defaulting to `message` as the SSE format prescribes.
    pub fn event_name(&self) -> &str {
        self.event.as_deref().unwrap_or("message")
    }
}

/// Incremental decoder; bytes may be split anywhere across chunks.
#[derive(Default)]
pub(crate) struct SseDecoder {
    buf: Vec<u8>,
    /// Bytes before this offset hold no complete delimiter.
    scanned: usize,
}

impl SseDecoder {
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some((idx, delim_len)) = find_frame_delimiter(&self.buf, self.scanned) {
            let frame_bytes: Vec<u8> = self.buf.drain(..idx + delim_len).take(idx).collect();
            self.scanned = 0;
            if let Some(frame) = parse_sse_frame(&frame_bytes) {
                frames.push(frame);
            }
        }
        // A delimiter may still complete across the last three bytes.
        self.scanned = self.buf.len().saturating_sub(3);
        frames
    }
}

fn find_frame_delimiter(buf: &[u8], from: usize) -> Option<(usize, usize)> {
    let mut i = from;
    while i + 1 < buf.len() {
        if buf[i] == b'\n' && buf[i + 1] == b'\n' {
            return Some((i, 2));
        }
        if i + 3 < buf.len() && &buf[i..i + 4] == b"\r\n\r\n" {
            return Some((i, 4));
        }
        i += 1;
    }
    None
}

fn parse_sse_frame(bytes: &[u8]) -> Option<SseFrame> {
    if bytes.is_empty() {
        return None;
    }
    let text = String::from_utf8_lossy(bytes);
    let mut event: Option<String> = None;
    let mut data_lines: Vec<&str> = Vec::new();
    for raw_line in text.split('\n') {
        let line = raw_line.trim_end_matches('\r');
        // Blank lines and `:` comments (keep-alives) carry nothing.
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("event:") {
            event = Some(strip_single_space(rest).to_string());
            continue;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(strip_single_space(rest));
        }
    }
    if data_lines.is_empty() {
        return None;
    }
    Some(SseFrame {
        event,
        data: data_lines.join("\n"),
    })
}

fn strip_single_space(value: &str) -> &str {
    value.strip_prefix(' ').unwrap_or(value)
}

/// Maps a decoded frame onto a typed run event.
///
/// Unknown event names yield `Ok(None)`. Malformed `status`/`final` payloads
/// are errors; a malformed `error` payload degrades to a message-less error.
pub(crate) fn decode_frame(frame: &SseFrame) -> Result<Option<StreamEvent>, ClientError> {
    match frame.event_name() {
        "status" => serde_json::from_str::<StatusUpdate>(&frame.data)
            .map(|update| Some(StreamEvent::Status(update)))
            .map_err(|e| ClientError::stream_parse("status", e.to_string())),
        "final" => serde_json::from_str::<FinalEnvelope>(&frame.data)
            .map(|envelope| Some(StreamEvent::Final(envelope.data)))
            .map_err(|e| ClientError::stream_parse("final", e.to_string())),
        "error" => {
            let message = serde_json::from_str::<ErrorPayload>(&frame.data)
                .ok()
                .and_then(|payload| payload.message)
                .filter(|m| !m.trim().is_empty());
            Ok(Some(StreamEvent::Error { message }))
        }
        _ => Ok(None),
    }
}
