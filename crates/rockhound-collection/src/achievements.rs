//! Declarative achievement rules.
//!
//! Each rule is a pure predicate over the journal and the score. The rule
//! table is fixed at compile time; only the set of unlocked ids in
//! [`GameState`] changes, and ids are never removed from it.
//!
//! # Evaluation
//!
//! [`evaluate`] checks every locked rule against one snapshot of the
//! journal and score. Rules in the same batch never see each other's
//! rewards. Because a batch bonus raises the score, [`settle_unlocks`]
//! repeats the evaluation against the committed state until a batch comes
//! back empty, so a bonus that crosses a score threshold unlocks the
//! threshold rule in a follow-up batch.

use std::collections::BTreeSet;

use rockhound_ledger::{Posting, post};
use rockhound_types::{AchievementStatus, GameState, JournalEntry, Rarity, ScoreEntryKind};
use tracing::info;

use crate::error::CollectionError;

/// Predicate over the journal (newest first) and the current score.
pub type Predicate = fn(&[JournalEntry], u64) -> bool;

/// An achievement rule.
#[derive(Debug, Clone, Copy)]
pub struct Achievement {
    /// Stable id stored in the unlocked set.
    pub id: &'static str,
    /// Display title.
    pub title: &'static str,
    /// What the collector has to do.
    pub description: &'static str,
    /// Points granted on unlock.
    pub reward: u64,
    /// Unlock condition.
    pub predicate: Predicate,
}

fn count_rarity(journal: &[JournalEntry], rarity: Rarity) -> usize {
    journal.iter().filter(|entry| entry.rarity == rarity).count()
}

fn has_rarity(journal: &[JournalEntry], rarity: Rarity) -> bool {
    journal.iter().any(|entry| entry.rarity == rarity)
}

const fn first_find(journal: &[JournalEntry], _score: u64) -> bool {
    !journal.is_empty()
}

const fn rock_solid(journal: &[JournalEntry], _score: u64) -> bool {
    journal.len() >= 5
}

fn common_collector(journal: &[JournalEntry], _score: u64) -> bool {
    count_rarity(journal, Rarity::Common) >= 10
}

const fn high_roller(_journal: &[JournalEntry], score: u64) -> bool {
    score >= 1000
}

fn rare_find(journal: &[JournalEntry], _score: u64) -> bool {
    has_rarity(journal, Rarity::Rare)
}

fn epic_discovery(journal: &[JournalEntry], _score: u64) -> bool {
    has_rarity(journal, Rarity::Epic)
}

const fn journeyman_geologist(journal: &[JournalEntry], _score: u64) -> bool {
    journal.len() >= 15
}

fn legendary_hunter(journal: &[JournalEntry], _score: u64) -> bool {
    has_rarity(journal, Rarity::Legendary)
}

/// The rule table, in evaluation order.
pub const ACHIEVEMENTS: &[Achievement] = &[
    Achievement {
        id: "first-find",
        title: "First Find",
        description: "You identified your first specimen!",
        reward: 50,
        predicate: first_find,
    },
    Achievement {
        id: "rock-solid",
        title: "Rock Solid",
        description: "Identify 5 different specimens.",
        reward: 100,
        predicate: rock_solid,
    },
    Achievement {
        id: "common-collector",
        title: "Common Collector",
        description: "Collect 10 Common specimens.",
        reward: 75,
        predicate: common_collector,
    },
    Achievement {
        id: "high-roller",
        title: "High Roller",
        description: "Amass a total score of 1,000.",
        reward: 250,
        predicate: high_roller,
    },
    Achievement {
        id: "rare-find",
        title: "Rare Find",
        description: "Discover your first Rare specimen.",
        reward: 150,
        predicate: rare_find,
    },
    Achievement {
        id: "epic-discovery",
        title: "Epic Discovery",
        description: "Unearth an Epic specimen.",
        reward: 500,
        predicate: epic_discovery,
    },
    Achievement {
        id: "journeyman-geologist",
        title: "Journeyman Geologist",
        description: "Identify 15 different specimens.",
        reward: 200,
        predicate: journeyman_geologist,
    },
    Achievement {
        id: "legendary-hunter",
        title: "Legendary Hunter",
        description: "Find a specimen of Legendary rarity.",
        reward: 1000,
        predicate: legendary_hunter,
    },
];

/// Rules that newly hold in one evaluation batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unlocks {
    /// Rule ids in table order.
    pub ids: Vec<String>,
    /// Sum of their rewards.
    pub bonus: u64,
}

impl Unlocks {
    /// Returns `true` when nothing unlocked.
    pub const fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Evaluate every locked rule against one snapshot.
///
/// Pure and deterministic.
pub fn evaluate(journal: &[JournalEntry], score: u64, unlocked: &BTreeSet<String>) -> Unlocks {
    ACHIEVEMENTS
        .iter()
        .filter(|rule| !unlocked.contains(rule.id))
        .filter(|rule| (rule.predicate)(journal, score))
        .fold(Unlocks::default(), |mut acc, rule| {
            acc.ids.push(rule.id.to_owned());
            acc.bonus = acc.bonus.saturating_add(rule.reward);
            acc
        })
}

/// Record a batch: mark the ids unlocked and post the bonus as one row.
pub fn apply_unlocks(state: &mut GameState, unlocks: &Unlocks) -> Result<(), CollectionError> {
    if unlocks.is_empty() {
        return Ok(());
    }
    if unlocks.bonus > 0 {
        let delta = i64::try_from(unlocks.bonus).map_err(|e| {
            CollectionError::from(rockhound_ledger::LedgerError::OutOfRange(e.to_string()))
        })?;
        post(
            state,
            Posting {
                kind: ScoreEntryKind::AchievementBonus,
                delta,
                reason: format!("achievements: {}", unlocks.ids.join(", ")),
                reference_id: None,
            },
        )?;
    }
    state.unlocked_achievements.extend(unlocks.ids.iter().cloned());
    info!(
        ids = ?unlocks.ids,
        bonus = unlocks.bonus,
        score = state.score,
        "achievements unlocked"
    );
    Ok(())
}

/// Evaluate and apply batches until one comes back empty.
///
/// Returns the non-empty batches in order. Every batch unlocks at least one
/// rule, so this runs at most once per rule plus one.
pub fn settle_unlocks(state: &mut GameState) -> Result<Vec<Unlocks>, CollectionError> {
    let mut batches = Vec::new();
    for _ in 0..=ACHIEVEMENTS.len() {
        let unlocks = evaluate(&state.journal_entries, state.score, &state.unlocked_achievements);
        if unlocks.is_empty() {
            break;
        }
        apply_unlocks(state, &unlocks)?;
        batches.push(unlocks);
    }
    Ok(batches)
}

/// The rule table joined with the unlocked set, for display.
pub fn statuses(unlocked: &BTreeSet<String>) -> Vec<AchievementStatus> {
    ACHIEVEMENTS
        .iter()
        .map(|rule| AchievementStatus {
            id: rule.id.to_owned(),
            title: rule.title.to_owned(),
            description: rule.description.to_owned(),
            reward: rule.reward,
            unlocked: unlocked.contains(rule.id),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rockhound_ledger::{ConservationResult, verify};
    use rockhound_types::JournalEntryId;

    use super::*;

    fn specimen(rarity: Rarity) -> JournalEntry {
        JournalEntry {
            id: JournalEntryId::new(),
            name: "Specimen".to_owned(),
            description: String::new(),
            score: 0,
            date: Utc::now(),
            rarity,
            image_url: None,
            mineral_composition: None,
            hardness: None,
            geological_context: None,
        }
    }

    #[test]
    fn ids_are_unique() {
        let ids: BTreeSet<&str> = ACHIEVEMENTS.iter().map(|a| a.id).collect();
        assert_eq!(ids.len(), ACHIEVEMENTS.len());
    }

    #[test]
    fn empty_journal_unlocks_nothing() {
        assert!(evaluate(&[], 0, &BTreeSet::new()).is_empty());
    }

    #[test]
    fn first_find_on_first_entry() {
        let unlocks = evaluate(&[specimen(Rarity::Common)], 5, &BTreeSet::new());
        assert_eq!(unlocks.ids, vec!["first-find".to_owned()]);
        assert_eq!(unlocks.bonus, 50);
    }

    #[test]
    fn batch_sees_one_snapshot() {
        let journal = vec![specimen(Rarity::Legendary)];
        let unlocks = evaluate(&journal, 900, &BTreeSet::new());
        // high-roller does not see the 1050 bonus of the same batch.
        assert_eq!(
            unlocks.ids,
            vec!["first-find".to_owned(), "legendary-hunter".to_owned()]
        );
        assert_eq!(unlocks.bonus, 1050);
    }

    #[test]
    fn unlocked_rules_are_skipped() {
        let unlocked: BTreeSet<String> = ["first-find".to_owned()].into();
        let unlocks = evaluate(&[specimen(Rarity::Common)], 5, &unlocked);
        assert!(unlocks.is_empty());
    }

    #[test]
    fn settle_cascades_through_score_thresholds() {
        let mut state = GameState::default();
        let _ = post(
            &mut state,
            Posting {
                kind: ScoreEntryKind::Identification,
                delta: 900,
                reason: "seed".to_owned(),
                reference_id: None,
            },
        );
        state.journal_entries.push(specimen(Rarity::Legendary));

        let batches = settle_unlocks(&mut state).unwrap_or_default();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches.get(1).map(|b| b.ids.clone()), Some(vec!["high-roller".to_owned()]));
        assert_eq!(state.score, 900 + 1050 + 250);
        assert_eq!(verify(&state), ConservationResult::Balanced);

        let again = settle_unlocks(&mut state).unwrap_or_default();
        assert!(again.is_empty());
    }

    #[test]
    fn common_collector_needs_ten_commons() {
        let nine: Vec<JournalEntry> = (0..9).map(|_| specimen(Rarity::Common)).collect();
        assert!(!common_collector(&nine, 0));
        let ten: Vec<JournalEntry> = (0..10).map(|_| specimen(Rarity::Common)).collect();
        assert!(common_collector(&ten, 0));
    }

    #[test]
    fn statuses_reflect_unlocked_set() {
        let unlocked: BTreeSet<String> = ["rare-find".to_owned()].into();
        let view = statuses(&unlocked);
        assert_eq!(view.len(), ACHIEVEMENTS.len());
        assert!(view.iter().any(|s| s.id == "rare-find" && s.unlocked));
        assert_eq!(view.iter().filter(|s| s.unlocked).count(), 1);
    }
}
