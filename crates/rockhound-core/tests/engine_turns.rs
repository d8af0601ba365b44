//! End-to-end turns through the engine with scripted transports.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::missing_panics_doc,
    clippy::too_many_lines
)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use futures::StreamExt;
use rockhound_collection::{ListingDraft, TradeProposal};
use rockhound_core::config::GameSettings;
use rockhound_core::{
    AssistantTransport, EngineError, GameEngine, ReplyStream, TransportError, TurnRequest,
    UserMessage,
};
use rockhound_db::{MemoryStore, StateStore};
use rockhound_ledger::ConservationResult;
use rockhound_types::{
    ChatMessage, EngineEvent, ErrorKind, GameState, GeoPoint, ImageAttachment, JournalEntry,
    JournalEntryId, MessageAuthor, Rarity, TurnOutcome,
};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Transports
// ---------------------------------------------------------------------------

/// Replays canned replies, one per turn, and records every request.
#[derive(Default)]
struct ScriptedTransport {
    replies: Mutex<VecDeque<Vec<&'static str>>>,
    requests: Mutex<Vec<TurnRequest>>,
}

impl ScriptedTransport {
    fn new(replies: Vec<Vec<&'static str>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }
}

impl AssistantTransport for ScriptedTransport {
    fn stream_reply(&self, request: TurnRequest, _history: Vec<ChatMessage>) -> ReplyStream {
        self.requests.lock().unwrap().push(request);
        let fragments = self.replies.lock().unwrap().pop_front().unwrap_or_default();
        futures::stream::iter(fragments.into_iter().map(|f| Ok(f.to_owned()))).boxed()
    }
}

/// Sends one fragment, then breaks.
struct FailingTransport;

impl AssistantTransport for FailingTransport {
    fn stream_reply(&self, _request: TurnRequest, _history: Vec<ChatMessage>) -> ReplyStream {
        futures::stream::iter(vec![
            Ok("Looks like [NAME=Quartz][RARITY=Common]".to_owned()),
            Err(TransportError::Aborted("connection reset".to_owned())),
        ])
        .boxed()
    }
}

/// Sends one fragment, then never finishes.
struct StalledTransport;

impl AssistantTransport for StalledTransport {
    fn stream_reply(&self, _request: TurnRequest, _history: Vec<ChatMessage>) -> ReplyStream {
        futures::stream::iter(vec![Ok("Hmm, let me look [NAME=Quartz]".to_owned())])
            .chain(futures::stream::pending())
            .boxed()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const HERE: GeoPoint = GeoPoint {
    latitude: 38.0228,
    longitude: -107.6714,
};

fn specimen(name: &str, rarity: Rarity, score: u64) -> JournalEntry {
    JournalEntry {
        id: JournalEntryId::new(),
        name: name.to_owned(),
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

async fn engine_with(
    saved: Option<&GameState>,
    transport: Arc<dyn AssistantTransport>,
) -> (GameEngine, MemoryStore) {
    let memory = saved.map_or_else(MemoryStore::new, |state| {
        MemoryStore::with_document(serde_json::to_string(state).unwrap())
    });
    let engine = GameEngine::start(
        GameSettings::default(),
        StateStore::Memory(memory.clone()),
        transport,
    )
    .await;
    (engine, memory)
}

fn message(text: &str) -> UserMessage {
    UserMessage {
        text: text.to_owned(),
        images: Vec::new(),
        location: Some(HERE),
    }
}

fn with_photo(text: &str) -> UserMessage {
    UserMessage {
        images: vec![ImageAttachment {
            mime_type: "image/jpeg".to_owned(),
            data: "AAAA".to_owned(),
        }],
        ..message(text)
    }
}

fn drain(events: &mut broadcast::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

// ---------------------------------------------------------------------------
// Identification turns
// ---------------------------------------------------------------------------

#[tokio::test]
async fn streamed_identification_commits_entry_and_first_find() {
    let saved = GameState {
        score: 50,
        ..GameState::default()
    };
    let transport = ScriptedTransport::new(vec![vec![
        "Great find",
        "! [NAME=Quartz]",
        "[RARITY=Common][SCORE=55]",
    ]]);
    let (engine, memory) = engine_with(Some(&saved), transport.clone()).await;
    let mut events = engine.subscribe();

    let report = engine
        .send_message(with_photo("What is this?"))
        .await
        .unwrap()
        .finished()
        .await
        .unwrap();

    assert_eq!(report.outcome, TurnOutcome::Committed);
    assert_eq!(report.display_text, "Great find!");
    let entry = report.entry.unwrap();
    assert_eq!(entry.name, "Quartz");
    assert_eq!(entry.score, 5);
    assert_eq!(entry.image_url.as_deref(), Some("data:image/jpeg;base64,AAAA"));
    assert_eq!(report.unlocked, vec!["first-find".to_owned()]);

    let state = engine.state().await;
    assert_eq!(state.score, 55 + 50);
    assert_eq!(state.journal_entries[0].id, entry.id);
    assert_eq!(engine.ledger_status().await, ConservationResult::Balanced);

    let conversation = engine.conversation().await;
    assert_eq!(conversation.len(), 3);
    assert_eq!(conversation[2].author, MessageAuthor::Assistant);
    assert_eq!(conversation[2].text, "Great find!");

    let events = drain(&mut events);
    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::JournalEntryCreated { score: 55, .. }
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::AchievementsUnlocked { bonus: 50, score: 105, .. }
    )));
    assert!(matches!(
        events.last(),
        Some(EngineEvent::TurnEnded {
            outcome: TurnOutcome::Committed,
            ..
        })
    ));

    let requests = transport.requests.lock().unwrap();
    assert!(matches!(requests[0], TurnRequest::Chat { score: 50, .. }));
    drop(requests);

    engine.flush().await.unwrap();
    let document = memory.document().await.unwrap();
    assert!(document.contains("\"Quartz\""));
}

#[tokio::test]
async fn lower_declared_total_is_adopted() {
    let saved = GameState {
        score: 50,
        unlocked_achievements: ["first-find".to_owned()].into(),
        ..GameState::default()
    };
    let transport =
        ScriptedTransport::new(vec![vec!["Just shale. [NAME=Shale][RARITY=Common][SCORE=40]"]]);
    let (engine, _) = engine_with(Some(&saved), transport).await;

    let report = engine
        .send_message(with_photo("and this?"))
        .await
        .unwrap()
        .finished()
        .await
        .unwrap();

    assert_eq!(report.entry.map(|e| e.score), Some(0));
    assert_eq!(engine.state().await.score, 40);
    assert_eq!(engine.ledger_status().await, ConservationResult::Balanced);
}

#[tokio::test]
async fn malformed_json_is_shown_but_not_applied() {
    let transport = ScriptedTransport::new(vec![vec![
        "Interesting rock. ",
        "[IDENTIFICATION_JSON=not-json]",
    ]]);
    let (engine, _) = engine_with(None, transport).await;
    let before = engine.state().await;
    let mut events = engine.subscribe();

    let report = engine
        .send_message(message("identify"))
        .await
        .unwrap()
        .finished()
        .await
        .unwrap();

    assert_eq!(report.outcome, TurnOutcome::NoChange);
    assert_eq!(report.display_text, "Interesting rock.");
    assert!(report.error.is_some());
    assert_eq!(engine.state().await, before);
    assert!(drain(&mut events).iter().any(|e| matches!(
        e,
        EngineEvent::Error {
            kind: ErrorKind::MalformedPayload,
            ..
        }
    )));
    assert_eq!(engine.conversation().await.len(), 3);
}

#[tokio::test]
async fn plain_reply_changes_nothing() {
    let transport = ScriptedTransport::new(vec![vec!["Hello there, rockhound!"]]);
    let (engine, _) = engine_with(None, transport).await;
    let before = engine.state().await;

    let report = engine
        .send_message(message("hi"))
        .await
        .unwrap()
        .finished()
        .await
        .unwrap();

    assert_eq!(report.outcome, TurnOutcome::NoChange);
    assert_eq!(engine.state().await, before);
}

#[tokio::test]
async fn identification_without_a_photo_is_plain_text() {
    let transport = ScriptedTransport::new(vec![vec![
        "Looks like quartz. [NAME=Quartz][RARITY=Common][SCORE=9000]",
    ]]);
    let (engine, _) = engine_with(None, transport).await;
    let before = engine.state().await;
    let mut events = engine.subscribe();

    let report = engine
        .send_message(message("I think I found quartz"))
        .await
        .unwrap()
        .finished()
        .await
        .unwrap();

    assert_eq!(report.outcome, TurnOutcome::NoChange);
    assert_eq!(report.display_text, "Looks like quartz.");
    assert!(report.entry.is_none());
    assert_eq!(engine.state().await, before);
    assert!(!drain(&mut events)
        .iter()
        .any(|e| matches!(e, EngineEvent::JournalEntryCreated { .. })));
}

#[tokio::test]
async fn challenge_reply_cannot_award_an_entry() {
    let transport = ScriptedTransport::new(vec![vec![
        "Try finding quartz here! [NAME=Quartz][RARITY=Common][SCORE=9000]",
    ]]);
    let (engine, _) = engine_with(None, transport).await;
    let before = engine.state().await;

    let report = engine
        .request_challenge(Some(HERE))
        .await
        .unwrap()
        .finished()
        .await
        .unwrap();

    assert_eq!(report.outcome, TurnOutcome::NoChange);
    assert!(report.entry.is_none());
    let after = engine.state().await;
    assert_eq!(after.score, before.score);
    assert_eq!(after.journal_entries, before.journal_entries);
}

// ---------------------------------------------------------------------------
// Failures, cancellation and the busy guard
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_location_abandons_the_turn() {
    let transport = ScriptedTransport::new(vec![vec!["[NAME=Quartz][RARITY=Common][SCORE=5]"]]);
    let (engine, _) = engine_with(None, transport.clone()).await;
    let before = engine.state().await;

    let report = engine
        .send_message(UserMessage {
            location: None,
            ..message("where am I?")
        })
        .await
        .unwrap()
        .finished()
        .await
        .unwrap();

    assert_eq!(report.outcome, TurnOutcome::Failed);
    assert_eq!(engine.state().await, before);
    assert_eq!(engine.conversation().await.len(), 1);
    assert!(transport.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn transport_failure_rolls_back_conversation() {
    let (engine, _) = engine_with(None, Arc::new(FailingTransport)).await;
    let before = engine.state().await;
    let mut events = engine.subscribe();

    let report = engine
        .send_message(message("look"))
        .await
        .unwrap()
        .finished()
        .await
        .unwrap();

    assert_eq!(report.outcome, TurnOutcome::Failed);
    assert_eq!(engine.state().await, before);
    assert_eq!(engine.conversation().await.len(), 1);
    assert!(drain(&mut events).iter().any(|e| matches!(
        e,
        EngineEvent::Error {
            kind: ErrorKind::Transport,
            ..
        }
    )));
    assert!(!engine.is_busy());
}

#[tokio::test]
async fn busy_guard_and_cancellation() {
    let (engine, _) = engine_with(None, Arc::new(StalledTransport)).await;
    let before = engine.state().await;
    let mut events = engine.subscribe();

    let handle = engine.send_message(message("first")).await.unwrap();
    assert!(engine.is_busy());
    assert!(matches!(
        engine.send_message(message("second")).await,
        Err(EngineError::Busy)
    ));
    assert!(matches!(engine.purchase("2").await, Err(EngineError::Busy)));

    // Let the first fragment land before cancelling.
    loop {
        if let Ok(EngineEvent::DisplayText { .. }) = events.recv().await {
            break;
        }
    }
    assert!(engine.cancel_turn().await);
    let report = handle.finished().await.unwrap();

    assert_eq!(report.outcome, TurnOutcome::Cancelled);
    assert_eq!(engine.state().await, before);
    assert_eq!(engine.conversation().await.len(), 1);
    assert!(!engine.is_busy());
    assert!(!engine.cancel_turn().await);
}

#[tokio::test]
async fn empty_message_is_refused() {
    let (engine, _) = engine_with(None, ScriptedTransport::new(Vec::new())).await;
    assert!(matches!(
        engine.send_message(message("   ")).await,
        Err(EngineError::EmptyMessage)
    ));
    assert!(!engine.is_busy());
}

// ---------------------------------------------------------------------------
// Trades
// ---------------------------------------------------------------------------

fn trade_state() -> (GameState, TradeProposal) {
    let quartz = specimen("Quartz", Rarity::Common, 5);
    let beryl = specimen("Beryl", Rarity::Rare, 50);
    let proposal = TradeProposal {
        offered: quartz.id,
        requested: beryl.id,
    };
    let state = GameState {
        score: 5,
        journal_entries: vec![quartz],
        unlocked_achievements: ["first-find".to_owned()].into(),
        trade_inventory: [(beryl.id, beryl)].into(),
        ..GameState::default()
    };
    (state, proposal)
}

#[tokio::test]
async fn accepted_trade_swaps_and_scores() {
    let (saved, proposal) = trade_state();
    let transport =
        ScriptedTransport::new(vec![vec!["A fine quartz. Deal! ", "[TRADE_ACCEPTED=true]"]]);
    let (engine, _) = engine_with(Some(&saved), transport).await;

    let report = engine
        .propose_trade(proposal)
        .await
        .unwrap()
        .finished()
        .await
        .unwrap();

    assert_eq!(report.outcome, TurnOutcome::Committed);
    assert_eq!(report.settlement.map(|s| s.score_delta), Some(45));
    assert_eq!(report.unlocked, vec!["rare-find".to_owned()]);

    let state = engine.state().await;
    assert_eq!(state.score, 5 + 45 + 150);
    assert_eq!(state.journal_entries[0].id, proposal.requested);
    assert!(state.trade_inventory.contains_key(&proposal.offered));
    assert_eq!(engine.ledger_status().await, ConservationResult::Balanced);
}

#[tokio::test]
async fn declined_or_missing_verdict_changes_nothing() {
    let (saved, proposal) = trade_state();
    let transport = ScriptedTransport::new(vec![
        vec!["Not today. [TRADE_ACCEPTED=false]"],
        vec!["I need to think about it."],
    ]);
    let (engine, _) = engine_with(Some(&saved), transport).await;
    let before = engine.state().await;

    for _ in 0..2 {
        let report = engine
            .propose_trade(proposal)
            .await
            .unwrap()
            .finished()
            .await
            .unwrap();
        assert_eq!(report.outcome, TurnOutcome::NoChange);
        assert_eq!(report.settlement.map(|s| s.accepted), Some(false));
        assert_eq!(engine.state().await, before);
    }
}

#[tokio::test]
async fn invalid_proposal_is_refused_before_the_assistant() {
    let (saved, proposal) = trade_state();
    let transport = ScriptedTransport::new(Vec::new());
    let (engine, _) = engine_with(Some(&saved), transport.clone()).await;

    let bogus = TradeProposal {
        offered: JournalEntryId::new(),
        ..proposal
    };
    assert!(matches!(
        engine.propose_trade(bogus).await,
        Err(EngineError::Trade { .. })
    ));
    assert!(transport.requests.lock().unwrap().is_empty());
    assert!(!engine.is_busy());
}

// ---------------------------------------------------------------------------
// Store, listings and seeding
// ---------------------------------------------------------------------------

#[tokio::test]
async fn purchases_check_score_and_ownership() {
    let saved = GameState {
        score: 800,
        ..GameState::default()
    };
    let (engine, _) = engine_with(Some(&saved), ScriptedTransport::new(Vec::new())).await;

    assert!(matches!(
        engine.purchase("1").await,
        Err(EngineError::Purchase { .. })
    ));
    let row = engine.purchase("2").await.unwrap();
    assert_eq!(row.delta, -750);
    assert_eq!(engine.state().await.score, 50);
    assert!(matches!(
        engine.purchase("2").await,
        Err(EngineError::Purchase { .. })
    ));
    assert_eq!(engine.ledger_status().await, ConservationResult::Balanced);
}

#[tokio::test]
async fn fresh_game_is_seeded_and_listings_prepend() {
    let (engine, memory) = engine_with(None, ScriptedTransport::new(Vec::new())).await;
    let state = engine.state().await;
    assert_eq!(state.trade_inventory.len(), 5);
    assert_eq!(state.listings.len(), 3);

    let listing = engine
        .create_listing(ListingDraft {
            property_name: "Basalt Ridge".to_owned(),
            land_owner_name: "Ada Stone".to_owned(),
            location: "Near Bend, Oregon".to_owned(),
            fee: 15,
            minerals_known: vec!["Obsidian".to_owned()],
            access_rules: "Stay on trails.".to_owned(),
            additional_notes: String::new(),
            image_url: None,
        })
        .await
        .unwrap();
    let listings = engine.listings().await;
    assert_eq!(listings.len(), 4);
    assert_eq!(listings[0].id, listing.id);

    engine.flush().await.unwrap();
    assert!(memory.document().await.unwrap().contains("Basalt Ridge"));
}

#[tokio::test]
async fn challenge_request_carries_tier() {
    let saved = GameState {
        score: 1200,
        ..GameState::default()
    };
    let transport = ScriptedTransport::new(vec![vec!["Find a geode near the river."]]);
    let (engine, _) = engine_with(Some(&saved), transport.clone()).await;

    let report = engine
        .request_challenge(Some(HERE))
        .await
        .unwrap()
        .finished()
        .await
        .unwrap();

    assert_eq!(report.outcome, TurnOutcome::NoChange);
    let requests = transport.requests.lock().unwrap();
    assert!(matches!(
        requests[0],
        TurnRequest::Challenge {
            tier: rockhound_types::DifficultyTier::Intermediate,
            ..
        }
    ));
}
