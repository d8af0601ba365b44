//! Buffering of streamed assistant fragments into one transcript.

/// Concatenates assistant fragments into the transcript of the current
/// turn.
///
/// Fragments may split the text anywhere, including inside a tag; the
/// extractor copes with that by rescanning from the last pending `[`.
#[derive(Debug, Clone, Default)]
pub struct StreamAccumulator {
    transcript: String,
    fragments: usize,
}

impl StreamAccumulator {
    /// Create an empty accumulator.
    pub const fn new() -> Self {
        Self {
            transcript: String::new(),
            fragments: 0,
        }
    }

    /// Append a fragment and return the full transcript so far.
    ///
    /// Empty fragments are ignored.
    pub fn append(&mut self, fragment: &str) -> &str {
        if !fragment.is_empty() {
            self.transcript.push_str(fragment);
            self.fragments = self.fragments.saturating_add(1);
        }
        &self.transcript
    }

    /// The transcript accumulated so far.
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// Number of non-empty fragments appended since the last reset.
    pub const fn fragment_count(&self) -> usize {
        self.fragments
    }

    /// Clear the transcript at the start of a new turn.
    pub fn reset(&mut self) {
        self.transcript.clear();
        self.fragments = 0;
    }

    /// Consume the accumulator and return the transcript.
    pub fn into_transcript(self) -> String {
        self.transcript
    }
}
