//! Server-sent events decoding for streaming LLM replies.
//!
//! Chunks from the HTTP body arrive at arbitrary byte boundaries, including
//! inside a multi-byte UTF-8 sequence. The decoder buffers raw bytes and
//! only decodes complete lines; a newline byte never occurs inside a UTF-8
//! sequence, so every decoded line is whole.

use serde_json::Value;

/// One dispatched server-sent event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// The `event:` field, if present.
    pub event: Option<String>,
    /// All `data:` lines joined with `\n`.
    pub data: String,
}

/// Incremental SSE parser.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    /// Create an empty decoder.
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            event: None,
            data: Vec::new(),
        }
    }

    /// Feed a chunk and return every event it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let text = String::from_utf8_lossy(&line);
            let text = text.trim_end_matches(['\n', '\r']);
            if let Some(event) = self.line(text) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing event that was not followed by a blank line.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let text = String::from_utf8_lossy(&rest).into_owned();
            if let Some(event) = self.line(text.trim_end_matches('\r')) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.strip_prefix(' ').unwrap_or(value);
        match field {
            "data" => self.data.push(value.to_owned()),
            "event" => self.event = Some(value.to_owned()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.data.is_empty() {
            self.event = None;
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent {
            event: self.event.take(),
            data,
        })
    }
}

// ---------------------------------------------------------------------------
// Dialects
// ---------------------------------------------------------------------------

/// What one event means for the reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delta {
    /// A text fragment.
    Text(String),
    /// The reply is complete.
    Done,
    /// The backend reported an error.
    Error(String),
    /// Bookkeeping with no text.
    Skip,
}

/// Event vocabulary of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `choices[0].delta.content`, terminated by `[DONE]`.
    OpenAi,
    /// `content_block_delta` events, terminated by `message_stop`.
    Anthropic,
}

impl Dialect {
    /// Interpret one event.
    pub fn delta(self, event: &SseEvent) -> Delta {
        if event.data.trim() == "[DONE]" {
            return Delta::Done;
        }
        let Ok(json) = serde_json::from_str::<Value>(&event.data) else {
            return Delta::Skip;
        };
        match self {
            Self::OpenAi => openai_delta(&json),
            Self::Anthropic => anthropic_delta(&json),
        }
    }
}

fn openai_delta(json: &Value) -> Delta {
    if let Some(message) = json.pointer("/error/message").and_then(Value::as_str) {
        return Delta::Error(message.to_owned());
    }
    json.pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map_or(Delta::Skip, |text| Delta::Text(text.to_owned()))
}

fn anthropic_delta(json: &Value) -> Delta {
    match json.get("type").and_then(Value::as_str) {
        Some("content_block_delta") => json
            .pointer("/delta/text")
            .and_then(Value::as_str)
            .map_or(Delta::Skip, |text| Delta::Text(text.to_owned())),
        Some("message_stop") => Delta::Done,
        Some("error") => Delta::Error(
            json.pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_owned(),
        ),
        _ => Delta::Skip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(chunks: &[&[u8]]) -> Vec<SseEvent> {
        let mut decoder = SseDecoder::new();
        let mut events: Vec<SseEvent> = chunks.iter().flat_map(|c| decoder.push(c)).collect();
        events.extend(decoder.finish());
        events
    }

    #[test]
    fn events_split_across_chunks() {
        let events = decode_all(&[b"data: {\"a\"", b":1}\n", b"\ndata: two\n\n"]);
        assert_eq!(events.len(), 2);
        assert_eq!(events.first().map(|e| e.data.as_str()), Some("{\"a\":1}"));
        assert_eq!(events.last().map(|e| e.data.as_str()), Some("two"));
    }

    #[test]
    fn split_utf8_sequence_is_reassembled() {
        let text = "data: Cr\u{00e9}me \u{1f48e}\n\n";
        let bytes = text.as_bytes();
        for cut in 0..bytes.len() {
            let (head, tail) = bytes.split_at(cut);
            let events = decode_all(&[head, tail]);
            assert_eq!(
                events.first().map(|e| e.data.as_str()),
                Some("Cr\u{00e9}me \u{1f48e}"),
                "cut at {cut}"
            );
        }
    }

    #[test]
    fn comments_and_crlf_are_handled() {
        let events = decode_all(&[b": keep-alive\r\n\r\nevent: ping\r\ndata: x\r\n\r\n"]);
        assert_eq!(
            events,
            vec![SseEvent {
                event: Some("ping".to_owned()),
                data: "x".to_owned()
            }]
        );
    }

    #[test]
    fn trailing_event_is_flushed() {
        let events = decode_all(&[b"data: last"]);
        assert_eq!(events.first().map(|e| e.data.as_str()), Some("last"));
    }

    #[test]
    fn openai_dialect() {
        let text = SseEvent {
            event: None,
            data: r#"{"choices":[{"delta":{"content":"Quartz"}}]}"#.to_owned(),
        };
        assert_eq!(Dialect::OpenAi.delta(&text), Delta::Text("Quartz".to_owned()));
        let role = SseEvent {
            event: None,
            data: r#"{"choices":[{"delta":{"role":"assistant"}}]}"#.to_owned(),
        };
        assert_eq!(Dialect::OpenAi.delta(&role), Delta::Skip);
        let done = SseEvent {
            event: None,
            data: "[DONE]".to_owned(),
        };
        assert_eq!(Dialect::OpenAi.delta(&done), Delta::Done);
    }

    #[test]
    fn anthropic_dialect() {
        let text = SseEvent {
            event: Some("content_block_delta".to_owned()),
            data: r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Geode"}}"#
                .to_owned(),
        };
        assert_eq!(Dialect::Anthropic.delta(&text), Delta::Text("Geode".to_owned()));
        let stop = SseEvent {
            event: Some("message_stop".to_owned()),
            data: r#"{"type":"message_stop"}"#.to_owned(),
        };
        assert_eq!(Dialect::Anthropic.delta(&stop), Delta::Done);
        let error = SseEvent {
            event: Some("error".to_owned()),
            data: r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#
                .to_owned(),
        };
        assert_eq!(Dialect::Anthropic.delta(&error), Delta::Error("Overloaded".to_owned()));
    }
}
