//! End-to-end rule scenarios over a single game state.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::collections::BTreeSet;

use chrono::Utc;
use proptest::prelude::*;
use rockhound_collection::{
    TradeProposal, commit, evaluate, reconcile, settle, settle_unlocks,
};
use rockhound_ledger::{ConservationResult, verify};
use rockhound_types::{GameState, JournalEntry, JournalEntryId, ProtocolPayload, Rarity};

fn identification(name: &str, rarity: Rarity, total: i64) -> ProtocolPayload {
    ProtocolPayload::Identification {
        name: name.to_owned(),
        rarity,
        new_total_score: total,
    }
}

fn identify(state: &mut GameState, payload: &ProtocolPayload) -> JournalEntry {
    let result = reconcile(payload, state.score, "described", "data:image/png;base64,AAAA").unwrap();
    commit(state, &result).unwrap();
    settle_unlocks(state).unwrap();
    result.entry
}

fn specimen(rarity: Rarity, score: u64) -> JournalEntry {
    JournalEntry {
        id: JournalEntryId::new(),
        name: format!("{rarity} specimen"),
        description: String::new(),
        score,
        date: Utc::now(),
        rarity,
        image_url: None,
        mineral_composition: None,
        hardness: None,
        geological_context: None,
    }
}

#[test]
fn lower_declared_total_is_adopted_with_zero_credit() {
    let mut state = GameState::default();
    identify(&mut state, &identification("Quartz", Rarity::Common, 0));
    // first-find bonus brings the score to 50
    assert_eq!(state.score, 50);

    let entry = identify(&mut state, &identification("Shale", Rarity::Common, 40));
    assert_eq!(entry.score, 0);
    assert_eq!(state.score, 40);
    assert_eq!(verify(&state), ConservationResult::Balanced);
}

#[test]
fn first_find_lands_with_the_base_delta() {
    let mut state = GameState::default();
    let entry = identify(&mut state, &identification("Quartz", Rarity::Common, 5));
    assert_eq!(entry.score, 5);
    assert!(state.unlocked_achievements.contains("first-find"));
    assert_eq!(state.score, 55);
    assert_eq!(state.journal_entries.len(), 1);
}

#[test]
fn accepted_trade_moves_score_by_the_value_difference() {
    let mut state = GameState::default();
    let common = identify(&mut state, &identification("Quartz", Rarity::Common, 5));
    let rare = specimen(Rarity::Rare, 50);
    state.trade_inventory.insert(rare.id, rare.clone());
    let before = state.score;

    let proposal = TradeProposal {
        offered: common.id,
        requested: rare.id,
    };
    let settlement = settle(&mut state, proposal, true).unwrap();
    assert_eq!(settlement.score_delta, 45);
    assert_eq!(state.score, before + 45);
    assert!(state.trade_inventory.contains_key(&common.id));
    assert_eq!(state.journal_entries[0].id, rare.id);
    assert_eq!(verify(&state), ConservationResult::Balanced);
}

fn rarity_strategy() -> impl Strategy<Value = Rarity> {
    prop_oneof![
        Just(Rarity::Common),
        Just(Rarity::Uncommon),
        Just(Rarity::Rare),
        Just(Rarity::Epic),
        Just(Rarity::Legendary),
        Just(Rarity::Unknown),
    ]
}

proptest! {
    #[test]
    fn evaluation_is_deterministic(
        rarities in prop::collection::vec(rarity_strategy(), 0..20),
        score in 0_u64..3_000,
    ) {
        let journal: Vec<JournalEntry> = rarities.into_iter().map(|r| specimen(r, 0)).collect();
        let unlocked = BTreeSet::new();
        let first = evaluate(&journal, score, &unlocked);
        let second = evaluate(&journal, score, &unlocked);
        prop_assert_eq!(&first, &second);

        // Already-unlocked rules never come back.
        let unlocked: BTreeSet<String> = first.ids.iter().cloned().collect();
        let third = evaluate(&journal, score, &unlocked);
        prop_assert!(third.ids.iter().all(|id| !unlocked.contains(id)));
        prop_assert!(third.is_empty());
    }

    #[test]
    fn trade_moves_exactly_one_entry_each_way(
        offered_score in 0_u64..500,
        requested_score in 0_u64..500,
        starting in 0_u64..500,
        accepted in any::<bool>(),
    ) {
        let mut state = GameState::default();
        if starting > 0 {
            rockhound_ledger::post(&mut state, rockhound_ledger::Posting {
                kind: rockhound_types::ScoreEntryKind::Identification,
                delta: i64::try_from(starting).unwrap(),
                reason: "seed".to_owned(),
                reference_id: None,
            }).unwrap();
        }
        let offered = specimen(Rarity::Common, offered_score);
        let requested = specimen(Rarity::Rare, requested_score);
        state.journal_entries.push(offered.clone());
        state.trade_inventory.insert(requested.id, requested.clone());
        let before = state.clone();

        let proposal = TradeProposal { offered: offered.id, requested: requested.id };
        match settle(&mut state, proposal, accepted) {
            Ok(settlement) if settlement.accepted => {
                let delta = i128::from(requested_score) - i128::from(offered_score);
                prop_assert_eq!(i128::from(state.score) - i128::from(before.score), delta);
                prop_assert_eq!(state.journal_entries.len(), before.journal_entries.len());
                prop_assert!(state.trade_inventory.contains_key(&offered.id));
                prop_assert!(state.journal_entry(requested.id).is_some());
            }
            Ok(_) | Err(_) => prop_assert_eq!(&state, &before),
        }
        prop_assert_eq!(verify(&state), ConservationResult::Balanced);
    }
}
