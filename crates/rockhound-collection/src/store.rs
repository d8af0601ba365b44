//! In-game store: spending score on field gear.

use rockhound_ledger::{Posting, post};
use rockhound_types::{GameState, ScoreEntry, ScoreEntryKind, StoreItem};
use tracing::info;

use crate::error::PurchaseError;

/// The store catalog.
pub fn catalog() -> Vec<StoreItem> {
    [
        (
            "1",
            "Pro Geologist's Hammer",
            "A high-quality hammer for precise rock splitting. Increases chances of finding rare crystals.",
            1000,
            "\u{1f528}",
        ),
        (
            "2",
            "Precision Loupe",
            "A 10x magnifying glass to inspect mineral details. Improves identification accuracy.",
            750,
            "\u{1f50e}",
        ),
        (
            "3",
            "GPS Field Navigator",
            "A rugged GPS device with topographic maps. Helps you find new collecting sites.",
            2500,
            "\u{1f6f0}\u{fe0f}",
        ),
        (
            "4",
            "Rare Specimen Case",
            "A protective case with custom foam inserts to safely store your most valuable finds.",
            1500,
            "\u{1f4e6}",
        ),
    ]
    .into_iter()
    .map(|(id, name, description, price, icon)| StoreItem {
        id: id.to_owned(),
        name: name.to_owned(),
        description: description.to_owned(),
        price,
        icon: icon.to_owned(),
    })
    .collect()
}

/// Buy `item_id` from `items`.
///
/// Fails without changing anything if the item is unknown, already owned,
/// or costs more than the current score.
pub fn purchase(
    state: &mut GameState,
    items: &[StoreItem],
    item_id: &str,
) -> Result<ScoreEntry, PurchaseError> {
    let item = items
        .iter()
        .find(|item| item.id == item_id)
        .ok_or_else(|| PurchaseError::UnknownItem(item_id.to_owned()))?;
    if state.purchased_items.contains(&item.id) {
        return Err(PurchaseError::AlreadyOwned(item.id.clone()));
    }
    if state.score < item.price {
        return Err(PurchaseError::InsufficientScore {
            price: item.price,
            score: state.score,
        });
    }

    let delta = i64::try_from(item.price)
        .ok()
        .and_then(i64::checked_neg)
        .ok_or(PurchaseError::InsufficientScore {
            price: item.price,
            score: state.score,
        })?;
    let row = post(
        state,
        Posting {
            kind: ScoreEntryKind::Purchase,
            delta,
            reason: format!("bought {}", item.name),
            reference_id: None,
        },
    )?;
    state.purchased_items.insert(item.id.clone());

    info!(item = %item.name, price = item.price, score = state.score, "store purchase");
    Ok(row)
}
