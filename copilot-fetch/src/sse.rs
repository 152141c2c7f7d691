//! Incremental server-sent-event parser.
//!
//! Handles the restricted SSE subset the chat stream uses: events are
//! separated by blank lines and only `data:` lines carry content. Every
//! other field line (`event:`, `id:`, comments) is ignored.

use copilot_core::StreamEvent;

/// Prefix of SSE data lines.
const DATA_PREFIX: &str = "data:";

/// Incremental parser for SSE text streams.
///
/// Bytes can be fed in arbitrary chunks; lines (and UTF-8 sequences) split
/// across chunk boundaries are reassembled before framing.
#[derive(Debug, Default)]
pub struct SseEventParser {
    line_buffer: Vec<u8>,
    data_lines: Vec<String>,
}

impl SseEventParser {
    /// Creates an empty parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds raw bytes and drains every event they complete.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        self.line_buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(newline) = self.line_buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.line_buffer.drain(..=newline).collect();
            if let Some(event) = self.push_line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }

        events
    }

    /// Processes one complete line.
    ///
    /// Returns an event when the line is blank and terminates a non-empty
    /// event.
    pub fn push_line(&mut self, line: &str) -> Option<StreamEvent> {
        let line = line.trim();

        if line.is_empty() {
            return self.flush();
        }

        if let Some(data) = line.strip_prefix(DATA_PREFIX) {
            self.data_lines.push(data.trim().to_string());
        }

        None
    }

    /// Flushes whatever is pending once the stream has closed.
    ///
    /// Covers streams that end without a trailing blank line.
    pub fn finish(&mut self) -> Option<StreamEvent> {
        let mut event = None;
        if !self.line_buffer.is_empty() {
            let rest = std::mem::take(&mut self.line_buffer);
            event = self.push_line(&String::from_utf8_lossy(&rest));
        }
        event.or_else(|| self.flush())
    }

    /// Returns true if no partial line or data line is pending.
    pub fn is_idle(&self) -> bool {
        self.line_buffer.is_empty() && self.data_lines.is_empty()
    }

    /// Parses a complete SSE body in one shot.
    pub fn parse_str(input: &str) -> Vec<StreamEvent> {
        let mut parser = Self::new();
        let mut events = parser.feed(input.as_bytes());
        events.extend(parser.finish());
        events
    }

    fn flush(&mut self) -> Option<StreamEvent> {
        if self.data_lines.is_empty() {
            return None;
        }

        let joined = self.data_lines.join("\n");
        self.data_lines.clear();

        let payload = joined.trim();
        if payload.is_empty() {
            None
        } else {
            Some(StreamEvent::decode(payload))
        }
    }
}
