//! Turning scanned tags into typed payloads and display text.
//!
//! Resolution rules, applied to the complete tags of a transcript:
//!
//! - the last occurrence of a repeated tag wins;
//! - `IDENTIFICATION_JSON` takes precedence over the `NAME`/`RARITY`/`SCORE`
//!   set, which takes precedence over `TRADE_ACCEPTED`;
//! - the tag set only yields a payload once all three tags carry a value;
//! - a finished transcript with `NAME` and `RARITY` but no usable `SCORE`
//!   is a malformed identification;
//! - every recognized tag is stripped from the display text, valid or not.

use rockhound_types::{ProtocolPayload, Rarity};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ProtocolError;
use crate::scanner::{RawTag, Scan, TagName, scan_from, strip_tags};

/// Which payload kinds the caller is interested in.
///
/// A trade evaluation only honours the verdict tag; identification tags in
/// that reply are stripped but ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpectedPayload {
    /// Any payload kind.
    #[default]
    Any,
    /// Only identification payloads.
    Identification,
    /// Only trade verdicts.
    TradeVerdict,
}

impl ExpectedPayload {
    const fn accepts_identification(self) -> bool {
        matches!(self, Self::Any | Self::Identification)
    }

    const fn accepts_verdict(self) -> bool {
        matches!(self, Self::Any | Self::TradeVerdict)
    }
}

/// State of the payload embedded in a transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadStatus {
    /// No complete payload (yet).
    Absent,
    /// A complete, well-formed payload.
    Complete(ProtocolPayload),
    /// A complete payload that could not be parsed.
    Malformed(ProtocolError),
}

/// Display text plus payload status for one transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Transcript with every recognized tag removed, trimmed.
    pub display_text: String,
    /// The embedded payload, if any.
    pub status: PayloadStatus,
}

impl Extraction {
    /// The payload, when complete and well formed.
    pub const fn payload(&self) -> Option<&ProtocolPayload> {
        match &self.status {
            PayloadStatus::Complete(payload) => Some(payload),
            PayloadStatus::Absent | PayloadStatus::Malformed(_) => None,
        }
    }

    /// The parse error, when the payload is malformed.
    pub const fn error(&self) -> Option<&ProtocolError> {
        match &self.status {
            PayloadStatus::Malformed(error) => Some(error),
            PayloadStatus::Absent | PayloadStatus::Complete(_) => None,
        }
    }
}

/// Extract the payload from a complete transcript in one pass.
///
/// Pure and idempotent: the same transcript always yields the same result.
pub fn try_extract(transcript: &str, expected: ExpectedPayload) -> Extraction {
    let scan = scan_from(transcript, 0, true);
    build(transcript, &scan.tags, expected, true)
}

/// Incremental extractor for a streaming transcript.
///
/// [`feed`](Self::feed) is called after every fragment with the full
/// transcript so far; only the text after the last pending `[` is
/// rescanned. [`finish`](Self::finish) settles any tag still cut off once
/// the stream has ended and gives the same result as [`try_extract`].
#[derive(Debug, Clone, Default)]
pub struct TagExtractor {
    expected: ExpectedPayload,
    tags: Vec<RawTag>,
    resume_at: usize,
    scanned_len: usize,
}

impl TagExtractor {
    /// Create an extractor for one turn.
    pub const fn new(expected: ExpectedPayload) -> Self {
        Self {
            expected,
            tags: Vec::new(),
            resume_at: 0,
            scanned_len: 0,
        }
    }

    /// Scan newly appended text and return the current extraction.
    pub fn feed(&mut self, transcript: &str) -> Extraction {
        self.advance(transcript, false);
        build(transcript, &self.tags, self.expected, false)
    }

    /// Treat `transcript` as complete and return the final extraction.
    pub fn finish(&mut self, transcript: &str) -> Extraction {
        self.advance(transcript, true);
        build(transcript, &self.tags, self.expected, true)
    }

    /// Forget everything scanned so far.
    pub fn reset(&mut self) {
        self.tags.clear();
        self.resume_at = 0;
        self.scanned_len = 0;
    }

    fn advance(&mut self, transcript: &str, finished: bool) {
        // A shorter transcript means a new one; start over.
        if transcript.len() < self.scanned_len || !transcript.is_char_boundary(self.resume_at) {
            debug!(
                previous_len = self.scanned_len,
                new_len = transcript.len(),
                "transcript rewound, rescanning from start"
            );
            self.reset();
        }
        let Scan { tags, resume_at } = scan_from(transcript, self.resume_at, finished);
        self.tags.extend(tags);
        self.resume_at = resume_at;
        self.scanned_len = transcript.len();
    }
}

fn build(
    transcript: &str,
    tags: &[RawTag],
    expected: ExpectedPayload,
    finished: bool,
) -> Extraction {
    Extraction {
        display_text: strip_tags(transcript, tags),
        status: resolve(tags, expected, finished),
    }
}

/// Last value of `name`, ignoring empty values.
fn last_value(tags: &[RawTag], name: TagName) -> Option<&str> {
    tags.iter()
        .rev()
        .find(|tag| tag.name == name)
        .map(|tag| tag.value.as_str())
        .filter(|value| !value.is_empty())
}

fn resolve(tags: &[RawTag], expected: ExpectedPayload, finished: bool) -> PayloadStatus {
    if expected.accepts_identification() {
        if let Some(json) = tags
            .iter()
            .rev()
            .find(|tag| tag.name == TagName::IdentificationJson)
        {
            return match parse_identification_json(&json.value) {
                Ok(payload) => PayloadStatus::Complete(payload),
                Err(error) => PayloadStatus::Malformed(error),
            };
        }

        if let (Some(name), Some(rarity), Some(score)) = (
            last_value(tags, TagName::Name),
            last_value(tags, TagName::Rarity),
            last_value(tags, TagName::Score),
        ) {
            return match parse_score(score) {
                Ok(new_total_score) => PayloadStatus::Complete(ProtocolPayload::Identification {
                    name: name.to_owned(),
                    rarity: Rarity::from_token(rarity),
                    new_total_score,
                }),
                Err(error) => PayloadStatus::Malformed(error),
            };
        }
    }

    if expected.accepts_verdict()
        && let Some(verdict) = tags
            .iter()
            .rev()
            .find(|tag| tag.name == TagName::TradeAccepted)
    {
        return match verdict.value.as_str() {
            "true" => PayloadStatus::Complete(ProtocolPayload::TradeVerdict { accepted: true }),
            "false" => PayloadStatus::Complete(ProtocolPayload::TradeVerdict { accepted: false }),
            other => PayloadStatus::Malformed(ProtocolError::InvalidVerdict(other.to_owned())),
        };
    }

    if finished
        && expected.accepts_identification()
        && last_value(tags, TagName::Name).is_some()
        && last_value(tags, TagName::Rarity).is_some()
    {
        return PayloadStatus::Malformed(ProtocolError::MissingField("score"));
    }

    PayloadStatus::Absent
}

/// Parse a declared total; an optional sign followed by digits.
fn parse_score(raw: &str) -> Result<i64, ProtocolError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .ok_or_else(|| ProtocolError::InvalidScore(raw.to_owned()))
}

// ---------------------------------------------------------------------------
// IDENTIFICATION_JSON
// ---------------------------------------------------------------------------

/// Parse the JSON body of an `IDENTIFICATION_JSON` tag.
///
/// Tries the body as-is, then with trailing commas stripped.
pub fn parse_identification_json(raw: &str) -> Result<ProtocolPayload, ProtocolError> {
    let value = match serde_json::from_str::<Value>(raw) {
        Ok(value) => value,
        Err(first) => match serde_json::from_str::<Value>(&strip_trailing_commas(raw)) {
            Ok(value) => value,
            Err(_) => return Err(ProtocolError::InvalidJson(first.to_string())),
        },
    };
    let object = value
        .as_object()
        .ok_or_else(|| ProtocolError::InvalidJson("expected a JSON object".to_owned()))?;

    let name = required_text(object, "name")?;
    let rarity = Rarity::from_token(&required_text(object, "rarity")?);
    let new_total_score = match object.get("score") {
        Some(Value::Number(number)) => number
            .as_i64()
            .ok_or_else(|| ProtocolError::InvalidScore(number.to_string()))?,
        Some(Value::String(text)) => parse_score(text)?,
        Some(other) => return Err(ProtocolError::InvalidScore(other.to_string())),
        None => return Err(ProtocolError::MissingField("score")),
    };

    Ok(ProtocolPayload::IdentificationJson {
        name,
        rarity,
        new_total_score,
        mineral_composition: optional_text(object, "mineralComposition"),
        hardness: optional_text(object, "hardness"),
        geological_context: optional_text(object, "geologicalContext"),
    })
}

fn required_text(object: &Map<String, Value>, key: &'static str) -> Result<String, ProtocolError> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
        .ok_or(ProtocolError::MissingField(key))
}

/// Text or number fields; anything else is treated as absent.
fn optional_text(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_owned()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Strip trailing commas before closing braces and brackets.
fn strip_trailing_commas(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == ',' {
            let next = chars.clone().find(|n| !n.is_whitespace());
            if matches!(next, Some('}' | ']')) {
                continue;
            }
        }
        result.push(c);
    }
    result
}
