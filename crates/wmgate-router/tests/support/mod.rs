//! Client-side decoding of `text/event-stream` bodies for router tests.

use wmgate_protocol::sse::{DONE_DATA, SseEvent};

pub fn is_done(event: &SseEvent) -> bool {
    event.event.is_none() && event.data == DONE_DATA
}

/// Incremental decoder. Raw bytes are buffered and only complete lines are
/// decoded, so chunks may split multi-byte characters.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    event: Option<String>,
    data_lines: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_bytes(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                self.flush(&mut events);
            } else {
                self.handle_line(line);
            }
        }
        events
    }

    /// Flushes a trailing event that was not followed by a blank line.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        let raw = std::mem::take(&mut self.buffer);
        let rest = String::from_utf8_lossy(&raw);
        let rest = rest.trim_end_matches('\r');
        if !rest.is_empty() {
            self.handle_line(rest);
        }
        let mut events = Vec::new();
        self.flush(&mut events);
        events
    }

    fn handle_line(&mut self, line: &str) {
        if line.starts_with(':') {
            return;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = (!value.is_empty()).then(|| value.to_string()),
            "data" => self.data_lines.push(value.to_string()),
            _ => {}
        }
    }

    fn flush(&mut self, events: &mut Vec<SseEvent>) {
        if self.event.is_none() && self.data_lines.is_empty() {
            return;
        }
        events.push(SseEvent {
            event: self.event.take(),
            data: self.data_lines.join("\n"),
        });
        self.data_lines.clear();
    }
}

#[test]
fn parser_joins_split_chunks_and_skips_comments() {
    let mut parser = SseParser::new();
    assert!(parser.push_bytes(b": keep-alive\n\nevent: a\nda").is_empty());
    let events = parser.push_bytes(b"ta: 1\r\ndata: 2\n\ndata: [DONE]\n\n");
    assert_eq!(events, vec![SseEvent::named("a", "1\n2"), SseEvent::done()]);
    assert!(is_done(&events[1]));
}

#[test]
fn parser_keeps_characters_split_across_chunks() {
    let frame = SseEvent::data("héllo ✓").encode();
    // 'é' is two bytes; cut between them.
    let cut = frame.iter().position(|byte| *byte == 0xC3).unwrap() + 1;
    let mut parser = SseParser::new();
    assert!(parser.push_bytes(&frame[..cut]).is_empty());
    let events = parser.push_bytes(&frame[cut..]);
    assert_eq!(events, vec![SseEvent::data("héllo ✓")]);
}

#[test]
fn finish_flushes_unterminated_event() {
    let mut parser = SseParser::new();
    assert!(parser.push_bytes(b"data: tail").is_empty());
    assert_eq!(parser.finish(), vec![SseEvent::data("tail")]);
}
