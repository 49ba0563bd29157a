//! Incremental `text/event-stream` decoder.
//!
//! Follows the event stream interpretation rules of the HTML Living Standard:
//! lines end in LF, CR or CRLF; lines starting with `:` are comments; a field
//! value loses one leading space; `data` lines accumulate joined by `\n`; a
//! blank line dispatches the pending event. An event with no data is dropped
//! but still updates the last event id. `retry` fields are ignored; reconnect
//! timing belongs to the connection's retry policy.
//!
//! Chunks may split anywhere, including between the CR and LF of a CRLF pair.

use bytes::{Buf, BytesMut};

const CR: u8 = b'\r';
const LF: u8 = b'\n';

/// Event type used when the stream does not name one.
pub const DEFAULT_EVENT_TYPE: &str = "message";

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event type, [`DEFAULT_EVENT_TYPE`] if unspecified.
    pub event: String,
    /// Data payload, multi-line data joined by `\n`.
    pub data: String,
    /// Last event id seen on the stream (may be empty).
    pub id: String,
}

/// Stateful decoder fed with raw body chunks.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: BytesMut,
    event_type: String,
    data: String,
    has_data: bool,
    last_event_id: String,
}

impl SseDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every event it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some((line_end, rest_start)) = find_eol(&self.buffer) {
            let line = self.buffer.split_to(line_end).freeze();
            self.buffer.advance(rest_start - line_end);

            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }
        events
    }

    fn process_line(&mut self, line: &[u8]) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }

        let (name, value) = match memchr::memchr(b':', line) {
            Some(0) => return None,
            Some(pos) => {
                let value = &line[pos + 1..];
                (&line[..pos], value.strip_prefix(b" ").unwrap_or(value))
            },
            None => (line, &[][..]),
        };

        // Lines that are not UTF-8 are ignored rather than poisoning the stream.
        let value = std::str::from_utf8(value).ok()?;

        match name {
            b"event" => self.event_type = value.to_string(),
            b"data" => {
                if self.has_data {
                    self.data.push('\n');
                }
                self.data.push_str(value);
                self.has_data = true;
            },
            b"id" => {
                if !value.contains('\0') {
                    self.last_event_id = value.to_string();
                }
            },
            _ => {},
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event_type = std::mem::take(&mut self.event_type);
        let data = std::mem::take(&mut self.data);
        let has_data = std::mem::replace(&mut self.has_data, false);

        if !has_data {
            return None;
        }

        Some(SseEvent {
            event: if event_type.is_empty() { DEFAULT_EVENT_TYPE.to_string() } else { event_type },
            data,
            id: self.last_event_id.clone(),
        })
    }
}

/// `(line_end, rest_start)` of the first complete line, or `None` if more data
/// is needed. A trailing lone CR waits for the next chunk in case an LF follows.
fn find_eol(bytes: &[u8]) -> Option<(usize, usize)> {
    let pos = memchr::memchr2(CR, LF, bytes)?;

    if bytes[pos] == LF {
        return Some((pos, pos + 1));
    }
    match bytes.get(pos + 1) {
        None => None,
        Some(&LF) => Some((pos, pos + 2)),
        Some(_) => Some((pos, pos + 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_event() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"event: messages\ndata: []\nid: 7\n\n");
        assert_eq!(events, vec![SseEvent {
            event: "messages".into(),
            data: "[]".into(),
            id: "7".into(),
        }]);
    }

    #[test]
    fn id_carries_over_to_later_events() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"id: 7\nevent: noop\n\ndata: x\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "7");
    }

    #[test]
    fn default_event_type_and_multiline_data() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: a\ndata: b\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, DEFAULT_EVENT_TYPE);
        assert_eq!(events[0].data, "a\nb");
    }

    #[test]
    fn split_chunks_and_crlf() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"event: heart").is_empty());
        assert!(decoder.feed(b"beat\r").is_empty());
        assert!(decoder.feed(b"\ndata: {\"heartbeat\":30}\r\n\r").is_empty());
        let events = decoder.feed(b"\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "heartbeat");
        assert_eq!(events[0].data, "{\"heartbeat\":30}");
    }

    #[test]
    fn comments_and_empty_events_are_skipped() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b": keepalive\n\nevent: noop\n\ndata: x\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, DEFAULT_EVENT_TYPE);
        assert_eq!(events[0].data, "x");
    }

    #[test]
    fn retry_field_is_ignored() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"retry: 2500\ndata: x\n\n");
        assert_eq!(events, vec![SseEvent { event: DEFAULT_EVENT_TYPE.into(), data: "x".into(), id: String::new() }]);
    }

    #[test]
    fn field_without_colon() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "");
    }
}
