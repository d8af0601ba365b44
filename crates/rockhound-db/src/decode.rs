//! Tolerant decoding of a saved game state.
//!
//! Saved state may come from older builds, hand edits or a crash mid-write.
//! Decoding works per field and, within arrays, per element: whatever can be
//! salvaged is kept and every fallback is reported as an issue.
//!
//! | Field | Fallback |
//! |---|---|
//! | whole document | empty state |
//! | `score` | `0` (negative or fractional values are floored) |
//! | `journalEntries[i]` | element skipped |
//! | entry `id` | regenerated when missing or not a UUID |
//! | entry `rarity` | normalized token, else `Unknown` |
//! | `unlockedAchievements`, `purchasedItems` | non-string elements skipped |
//! | `listings[i]`, `scoreLedger[i]` | element skipped |

use chrono::{DateTime, Utc};
use rockhound_types::{
    GameState, JournalEntry, JournalEntryId, LandListing, Rarity, ScoreEntry,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// A decoded state plus every fallback that was taken.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decoded {
    /// The salvaged state.
    pub state: GameState,
    /// Human-readable notes, one per fallback.
    pub issues: Vec<String>,
}

/// Decode a saved document, never failing.
pub fn decode_state(raw: &str) -> Decoded {
    let mut decoded = Decoded::default();
    let root = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(root)) => root,
        Ok(other) => {
            decoded
                .issues
                .push(format!("state document is {}, not an object", kind_of(&other)));
            return decoded;
        }
        Err(e) => {
            decoded.issues.push(format!("state document is not JSON: {e}"));
            return decoded;
        }
    };

    let issues = &mut decoded.issues;
    let state = &mut decoded.state;

    state.score = decode_score(root.get("score"), issues);
    state.journal_entries = decode_entries(root.get("journalEntries"), "journalEntries", issues);
    state.unlocked_achievements =
        decode_id_set(root.get("unlockedAchievements"), "unlockedAchievements", issues);
    state.purchased_items = decode_id_set(root.get("purchasedItems"), "purchasedItems", issues);
    state.listings = decode_each::<LandListing>(root.get("listings"), "listings", issues);
    state.trade_inventory = decode_inventory(root.get("tradeInventory"), issues);
    state.score_ledger = decode_each::<ScoreEntry>(root.get("scoreLedger"), "scoreLedger", issues);

    decoded
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn decode_score(value: Option<&Value>, issues: &mut Vec<String>) -> u64 {
    let Some(value) = value else {
        return 0;
    };
    if let Some(score) = value.as_u64() {
        return score;
    }
    if let Some(score) = value.as_f64()
        && score.is_finite()
        && score > 0.0
    {
        issues.push(format!("score {score} is not an integer, flooring"));
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        return score.floor() as u64;
    }
    issues.push(format!("score {value} is unusable, defaulting to 0"));
    0
}

fn array<'a>(value: Option<&'a Value>, field: &str, issues: &mut Vec<String>) -> &'a [Value] {
    match value {
        None | Some(Value::Null) => &[],
        Some(Value::Array(items)) => items,
        Some(other) => {
            issues.push(format!("{field} is {}, not an array", kind_of(other)));
            &[]
        }
    }
}

fn decode_id_set(value: Option<&Value>, field: &str, issues: &mut Vec<String>) -> BTreeSet<String> {
    array(value, field, issues)
        .iter()
        .filter_map(|item| {
            let id = item.as_str().map(str::to_owned);
            if id.is_none() {
                issues.push(format!("{field}: skipped non-string id {item}"));
            }
            id
        })
        .collect()
}

fn decode_each<T: DeserializeOwned>(
    value: Option<&Value>,
    field: &str,
    issues: &mut Vec<String>,
) -> Vec<T> {
    array(value, field, issues)
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<T>(item.clone()) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                issues.push(format!("{field}[{index}] skipped: {e}"));
                None
            }
        })
        .collect()
}

fn decode_entries(value: Option<&Value>, field: &str, issues: &mut Vec<String>) -> Vec<JournalEntry> {
    array(value, field, issues)
        .iter()
        .enumerate()
        .filter_map(|(index, item)| decode_entry(item, &format!("{field}[{index}]"), issues))
        .collect()
}

fn decode_inventory(
    value: Option<&Value>,
    issues: &mut Vec<String>,
) -> BTreeMap<JournalEntryId, JournalEntry> {
    let items: Vec<(String, &Value)> = match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Object(map)) => map.iter().map(|(key, item)| (key.clone(), item)).collect(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| (index.to_string(), item))
            .collect(),
        Some(other) => {
            issues.push(format!("tradeInventory is {}, not an object", kind_of(other)));
            Vec::new()
        }
    };
    items
        .into_iter()
        .filter_map(|(key, item)| decode_entry(item, &format!("tradeInventory[{key}]"), issues))
        .map(|entry| (entry.id, entry))
        .collect()
}

/// Decode one journal entry, repairing what can be repaired.
///
/// `name` is the only field without a fallback.
fn decode_entry(value: &Value, at: &str, issues: &mut Vec<String>) -> Option<JournalEntry> {
    let Value::Object(fields) = value else {
        issues.push(format!("{at} skipped: {} is not an entry", kind_of(value)));
        return None;
    };
    let Some(name) = text(fields, "name").filter(|name| !name.trim().is_empty()) else {
        issues.push(format!("{at} skipped: missing name"));
        return None;
    };

    let id = match fields.get("id") {
        Some(Value::String(raw)) => JournalEntryId::parse(raw),
        _ => None,
    }
    .unwrap_or_else(|| {
        issues.push(format!("{at}: regenerated id"));
        JournalEntryId::new()
    });

    let score = match fields.get("score") {
        None => 0,
        Some(raw) => raw.as_u64().unwrap_or_else(|| {
            issues.push(format!("{at}: score {raw} clamped to 0"));
            0
        }),
    };

    let date = text(fields, "date")
        .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
        .map_or_else(
            || {
                issues.push(format!("{at}: missing or invalid date, using now"));
                Utc::now()
            },
            |date| date.with_timezone(&Utc),
        );

    let rarity = text(fields, "rarity").map_or(Rarity::Unknown, |token| Rarity::from_token(&token));

    Some(JournalEntry {
        id,
        name,
        description: text(fields, "description").unwrap_or_default(),
        score,
        date,
        rarity,
        image_url: text(fields, "imageUrl"),
        mineral_composition: text(fields, "mineralComposition"),
        hardness: text(fields, "hardness"),
        geological_context: text(fields, "geologicalContext"),
    })
}

/// String field, or a number rendered as text.
fn text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
