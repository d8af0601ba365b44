//! Lexical scanner for bracketed protocol tags.
//!
//! # Grammar
//!
//! ```text
//! tag   := "[" NAME "=" value "]"
//! NAME  := "NAME" | "RARITY" | "SCORE" | "TRADE_ACCEPTED" | "IDENTIFICATION_JSON"
//! value := any text up to the first "]", containing no newline or "["
//!        | "{" balanced JSON object "}" ws* "]"     (IDENTIFICATION_JSON only)
//! ```
//!
//! Names are matched exactly. A `SCORE` value must be an optionally signed
//! integer and a `TRADE_ACCEPTED` value must be `true` or `false`; brackets
//! with any other value are plain text. Any other bracketed text is left
//! alone.
//!
//! # Incremental scanning
//!
//! A `[` near the end of a partial transcript may still grow into a tag
//! (`[RARI`, `[SCORE=5`). The scanner stops there and reports it as the
//! resume point; the next scan starts from it instead of from the
//! beginning. Everything before the resume point is final: appending text
//! can never turn a decided tag into a non-tag or vice versa, so scanning
//! in pieces finds exactly the tags a single scan finds.

/// Tag names recognized by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagName {
    /// `[NAME=...]`
    Name,
    /// `[RARITY=...]`
    Rarity,
    /// `[SCORE=...]`
    Score,
    /// `[TRADE_ACCEPTED=...]`
    TradeAccepted,
    /// `[IDENTIFICATION_JSON=...]`
    IdentificationJson,
}

impl TagName {
    /// Every recognized name.
    pub const ALL: [Self; 5] = [
        Self::Name,
        Self::Rarity,
        Self::Score,
        Self::TradeAccepted,
        Self::IdentificationJson,
    ];

    /// Text between `[` and the value, including the `=`.
    pub const fn head(self) -> &'static str {
        match self {
            Self::Name => "NAME=",
            Self::Rarity => "RARITY=",
            Self::Score => "SCORE=",
            Self::TradeAccepted => "TRADE_ACCEPTED=",
            Self::IdentificationJson => "IDENTIFICATION_JSON=",
        }
    }
}

/// A complete tag found in a transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTag {
    /// Which tag.
    pub name: TagName,
    /// Value with surrounding whitespace trimmed.
    pub value: String,
    /// Byte offset of the opening `[`.
    pub start: usize,
    /// Byte offset just past the closing `]`.
    pub end: usize,
}

/// Result of one scanning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scan {
    /// Complete tags in transcript order.
    pub tags: Vec<RawTag>,
    /// Where the next pass must start. Equal to the transcript length unless
    /// a tag is still pending.
    pub resume_at: usize,
}

enum Bracket {
    Tag(RawTag),
    Text,
    Pending,
}

/// Scan `text` for tags starting at byte offset `start`.
///
/// With `finished` unset, a possible tag cut off by the end of the text is
/// reported through [`Scan::resume_at`]. With `finished` set the text is
/// known to be complete: an unterminated JSON object falls back to the
/// first-`]` rule and any other unterminated tag is plain text.
pub fn scan_from(text: &str, start: usize, finished: bool) -> Scan {
    let mut tags = Vec::new();
    let mut cursor = start;

    while let Some(offset) = text.get(cursor..).and_then(|rest| rest.find('[')) {
        let open = cursor.saturating_add(offset);
        match classify(text, open, finished) {
            Bracket::Tag(tag) => {
                cursor = tag.end;
                tags.push(tag);
            }
            Bracket::Text => cursor = open.saturating_add(1),
            Bracket::Pending => {
                return Scan {
                    tags,
                    resume_at: open,
                };
            }
        }
    }

    Scan {
        tags,
        resume_at: text.len(),
    }
}

/// Decide what the `[` at `open` starts.
fn classify(text: &str, open: usize, finished: bool) -> Bracket {
    let after_bracket = open.saturating_add(1);
    let rest = text.get(after_bracket..).unwrap_or_default();
    let mut could_grow = false;

    for name in TagName::ALL {
        let head = name.head();
        if rest.starts_with(head) {
            return classify_value(text, open, name, after_bracket.saturating_add(head.len()), finished);
        }
        if head.starts_with(rest) {
            could_grow = true;
        }
    }

    if could_grow && !finished {
        Bracket::Pending
    } else {
        Bracket::Text
    }
}

/// Find the end of a tag whose value starts at `value_start`.
fn classify_value(
    text: &str,
    open: usize,
    name: TagName,
    value_start: usize,
    finished: bool,
) -> Bracket {
    if name == TagName::IdentificationJson {
        let rest = text.get(value_start..).unwrap_or_default();
        let body = rest.trim_start();
        if body.starts_with('{') {
            let object_start = value_start.saturating_add(rest.len().saturating_sub(body.len()));
            match object_end(text, object_start) {
                Some(object_end) => {
                    let tail = text.get(object_end..).unwrap_or_default();
                    let after_ws = tail.trim_start();
                    if after_ws.starts_with(']') {
                        let close = object_end.saturating_add(tail.len().saturating_sub(after_ws.len()));
                        return make_tag(text, open, name, value_start, close);
                    }
                    if after_ws.is_empty() && !finished {
                        return Bracket::Pending;
                    }
                }
                None if !finished => return Bracket::Pending,
                None => {}
            }
        }
    }

    first_bracket_rule(text, open, name, value_start, finished)
}

/// The value runs to the first `]`; a newline or `[` first means no tag.
fn first_bracket_rule(
    text: &str,
    open: usize,
    name: TagName,
    value_start: usize,
    finished: bool,
) -> Bracket {
    let rest = text.get(value_start..).unwrap_or_default();
    match rest.find([']', '\n', '[']) {
        Some(offset) if rest.as_bytes().get(offset) == Some(&b']') => {
            let close = value_start.saturating_add(offset);
            let value = rest.get(..offset).unwrap_or_default();
            if value_fits(name, value.trim()) {
                make_tag(text, open, name, value_start, close)
            } else {
                Bracket::Text
            }
        }
        Some(_) => Bracket::Text,
        None if finished => Bracket::Text,
        None => Bracket::Pending,
    }
}

/// Whether `value` has the shape `name` requires.
fn value_fits(name: TagName, value: &str) -> bool {
    match name {
        TagName::Score => {
            let digits = value.strip_prefix('-').unwrap_or(value);
            !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
        }
        TagName::TradeAccepted => matches!(value, "true" | "false"),
        TagName::Name | TagName::Rarity | TagName::IdentificationJson => true,
    }
}

fn make_tag(text: &str, open: usize, name: TagName, value_start: usize, close: usize) -> Bracket {
    let value = text.get(value_start..close).unwrap_or_default().trim().to_owned();
    Bracket::Tag(RawTag {
        name,
        value,
        start: open,
        end: close.saturating_add(1),
    })
}

/// Byte offset just past the `}` that closes the object opening at `start`.
///
/// Braces inside JSON strings are ignored. Returns `None` if the object is
/// not closed before the end of `text`.
fn object_end(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth: usize = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut index = start;

    while let Some(&byte) = bytes.get(index) {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
        } else {
            match byte {
                b'"' => in_string = true,
                b'{' => depth = depth.saturating_add(1),
                b'}' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Some(index.saturating_add(1));
                    }
                }
                _ => {}
            }
        }
        index = index.saturating_add(1);
    }
    None
}

/// Remove every tag span from `text` and trim the result.
pub fn strip_tags(text: &str, tags: &[RawTag]) -> String {
    let mut display = String::with_capacity(text.len());
    let mut cursor = 0;
    for tag in tags {
        if tag.start >= cursor {
            display.push_str(text.get(cursor..tag.start).unwrap_or_default());
            cursor = tag.end;
        }
    }
    display.push_str(text.get(cursor..).unwrap_or_default());
    display.trim().to_owned()
}
