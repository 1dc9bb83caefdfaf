//! SSE (Server-Sent Events) framing utilities
//!
//! Assembles complete event bodies out of a byte stream whose chunk boundaries
//! are arbitrary.

/// Buffer that turns raw SSE bytes into complete event bodies.
///
/// Bytes are buffered until a full line is available, and `data:` lines are
/// buffered until the blank line that ends the event. Multiple `data:` lines
/// of one event are joined with `\n`. Other fields and comments are ignored.
///
/// # Example
/// ```
/// use spark_bridge::streaming::SseEventBuffer;
///
/// let mut buffer = SseEventBuffer::new();
///
/// // First chunk contains a partial event
/// let events = buffer.feed(b"data:aGVs");
/// assert!(events.is_empty());
///
/// // Second chunk completes it
/// let events = buffer.feed(b"bG8=\n\n");
/// assert_eq!(events, vec!["aGVsbG8="]);
/// ```
#[derive(Debug, Default)]
pub struct SseEventBuffer {
    /// Bytes of the line currently being received
    pending: Vec<u8>,
    /// `data:` values of the event currently being assembled
    data_lines: Vec<String>,
}

impl SseEventBuffer {
    /// Create a new empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes into the buffer and return the bodies of completed events.
    ///
    /// Lines are split on raw bytes before any UTF-8 decoding, so a multi-byte
    /// character split across two chunks is decoded intact.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut events = Vec::new();
        let mut consumed = 0;
        while let Some(offset) = self.pending[consumed..].iter().position(|b| *b == b'\n') {
            let end = consumed + offset;
            let mut line = &self.pending[consumed..end];
            if let Some(stripped) = line.strip_suffix(b"\r") {
                line = stripped;
            }
            let line = String::from_utf8_lossy(line).into_owned();
            consumed = end + 1;
            self.process_line(&line, &mut events);
        }
        self.pending.drain(..consumed);

        events
    }

    /// Flush at end of stream.
    ///
    /// Returns the body of a trailing event that never received its blank-line
    /// terminator, including a final line without a newline.
    pub fn finish(&mut self) -> Option<String> {
        if !self.pending.is_empty() {
            let line = String::from_utf8_lossy(&self.pending).into_owned();
            self.pending.clear();
            let mut events = Vec::new();
            self.process_line(line.trim_end_matches('\r'), &mut events);
            if let Some(event) = events.pop() {
                return Some(event);
            }
        }
        self.take_event()
    }

    /// Check if there's any buffered data not yet emitted as an event.
    pub fn has_incomplete(&self) -> bool {
        !self.pending.is_empty() || !self.data_lines.is_empty()
    }

    fn process_line(&mut self, line: &str, events: &mut Vec<String>) {
        if line.is_empty() {
            if let Some(event) = self.take_event() {
                events.push(event);
            }
            return;
        }
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            self.data_lines.push(value.to_string());
        }
    }

    fn take_event(&mut self) -> Option<String> {
        if self.data_lines.is_empty() {
            return None;
        }
        let body = self.data_lines.join("\n");
        self.data_lines.clear();
        Some(body)
    }
}
