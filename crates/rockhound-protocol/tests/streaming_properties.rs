//! Property tests: feeding a transcript in arbitrary pieces must give the
//! same result as extracting it in one go.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use proptest::prelude::*;
use rockhound_protocol::{
    ExpectedPayload, StreamAccumulator, TagExtractor, scan_from, try_extract,
};

const TRANSCRIPTS: &[&str] = &[
    "Great find! [NAME=Quartz][RARITY=Common][SCORE=55]",
    "That's a lovely [NAME=Amethyst] geode. [RARITY=Uncommon]\n[SCORE=120] Enjoy!",
    "[NAME=Calcite][NAME=Quartz] [note] [RARITY=rare][SCORE=-3][SCORE=70]",
    r#"Here you go [IDENTIFICATION_JSON={"name": "Beryl [emerald]", "rarity": "Rare", "score": 300, "hardness": 7.5}] happy hunting"#,
    "Looking at [IDENTIFICATION_JSON=not-json] this, hmm",
    "I'd take that trade. [TRADE_ACCEPTED=true]",
    "[NAME=Multi\nline] [SCORE=9] [RARITY=Epic] [NAME=Opal] trailing [SCO",
    "Café crystals [NAME=Célestine][RARITY=Rare][SCORE=88] ✨",
    "Price [SCORE=5 and up. [NAME=Quartz][RARITY=Common][SCORE=7]",
    "[SCORE=lots] [TRADE_ACCEPTED=maybe] [NAME=Jade][RARITY=Rare] done",
];

/// Split `text` at the given char positions and return the pieces.
fn split_at_chars(text: &str, mut cuts: Vec<usize>) -> Vec<String> {
    let boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    cuts.sort_unstable();
    cuts.dedup();
    let mut pieces = Vec::new();
    let mut start = 0;
    for cut in cuts {
        if let Some(&byte) = boundaries.get(cut)
            && byte > start
        {
            pieces.push(text[start..byte].to_owned());
            start = byte;
        }
    }
    pieces.push(text[start..].to_owned());
    pieces
}

proptest! {
    #[test]
    fn incremental_finish_matches_one_shot(
        index in 0_usize..TRANSCRIPTS.len(),
        cuts in prop::collection::vec(0_usize..120, 0..10),
    ) {
        let text = TRANSCRIPTS[index];
        let mut acc = StreamAccumulator::new();
        let mut extractor = TagExtractor::new(ExpectedPayload::Any);
        for piece in split_at_chars(text, cuts) {
            let transcript = acc.append(&piece).to_owned();
            extractor.feed(&transcript);
        }
        prop_assert_eq!(acc.transcript(), text);
        let incremental = extractor.finish(acc.transcript());
        prop_assert_eq!(incremental, try_extract(text, ExpectedPayload::Any));
    }

    #[test]
    fn resumed_scans_find_the_same_tags(
        index in 0_usize..TRANSCRIPTS.len(),
        cuts in prop::collection::vec(0_usize..120, 0..10),
    ) {
        let text = TRANSCRIPTS[index];
        let mut transcript = String::new();
        let mut tags = Vec::new();
        let mut resume_at = 0;
        for piece in split_at_chars(text, cuts) {
            transcript.push_str(&piece);
            let scan = scan_from(&transcript, resume_at, false);
            tags.extend(scan.tags);
            resume_at = scan.resume_at;
        }
        let whole = scan_from(text, 0, false);
        prop_assert_eq!(tags, whole.tags);
        prop_assert_eq!(resume_at, whole.resume_at);
    }

    #[test]
    fn feeding_the_same_transcript_twice_changes_nothing(index in 0_usize..TRANSCRIPTS.len()) {
        let text = TRANSCRIPTS[index];
        let mut extractor = TagExtractor::new(ExpectedPayload::Any);
        let first = extractor.feed(text);
        let second = extractor.feed(text);
        prop_assert_eq!(first, second);
    }
}

#[test]
fn scenario_a_fragments_produce_the_payload_once_complete() {
    let mut acc = StreamAccumulator::new();
    let mut extractor = TagExtractor::new(ExpectedPayload::Any);
    let mut payloads = Vec::new();
    for fragment in ["Great find", "! [NAME=Quartz]", "[RARITY=Common][SCORE=55]"] {
        let transcript = acc.append(fragment).to_owned();
        payloads.push(extractor.feed(&transcript).payload().cloned());
    }
    assert!(payloads[0].is_none());
    assert!(payloads[1].is_none());
    assert_eq!(
        payloads[2].as_ref().and_then(rockhound_types::ProtocolPayload::declared_total),
        Some(55)
    );
}
