//! The turn engine: owns the game state and runs one assistant turn at a
//! time.
//!
//! # Turn lifecycle
//!
//! ```text
//! Idle -> Streaming -> Extracting -> ReconcilingIdentification -> EvaluatingAchievements -> Idle
//!                                 -> SettlingTrade ------------> EvaluatingAchievements -> Idle
//!                                 -> NoPayload -------------------------------------------> Idle
//! ```
//!
//! An intent is accepted or refused synchronously: the busy guard is taken,
//! the request is validated and the turn is spawned. Everything after that
//! is reported through [`EngineEvent`]s and the returned [`TurnHandle`].
//!
//! Commits are computed on a scratch copy of the state and swapped in under
//! the write lock, so readers never observe a journal entry without its
//! score change. A transport failure or cancellation abandons the turn
//! before anything is committed and removes the turn's messages from the
//! conversation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;
use rockhound_collection::{
    ListingDraft, Settlement, TradeProposal, Unlocks, catalog, commit, create_listing, purchase,
    quote, reconcile, settle, settle_unlocks, statuses,
};
use rockhound_db::{LoadSource, StateStore};
use rockhound_ledger::{ConservationResult, verify};
use rockhound_protocol::{ExpectedPayload, Extraction, PayloadStatus, StreamAccumulator, TagExtractor};
use rockhound_types::{
    AchievementStatus, ChatMessage, DifficultyTier, EngineEvent, ErrorKind, GameState, GeoPoint,
    ImageAttachment, JournalEntry, LandListing, MessageAuthor, PointOfInterest, ProtocolPayload,
    ScoreEntry, StoreItem, TurnId, TurnKind, TurnOutcome, TurnPhase,
};
use tokio::sync::{Mutex, RwLock, broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::config::GameSettings;
use crate::error::EngineError;
use crate::seed::seed_state;
use crate::transport::{AssistantTransport, TurnRequest};

const CHALLENGE_PROMPT: &str = "Give me a new challenge based on my current location.";
const LOCATION_UNAVAILABLE: &str =
    "Could not get your location. Please enable location services for accurate responses.";
const TRANSPORT_FAILED: &str =
    "An error occurred while communicating with the assistant. Please try again.";

// ---------------------------------------------------------------------------
// Intents and reports
// ---------------------------------------------------------------------------

/// A chat message from the collector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserMessage {
    /// Typed text, possibly empty when images are attached.
    pub text: String,
    /// Specimen photos.
    pub images: Vec<ImageAttachment>,
    /// Current position, when the client has a fix.
    pub location: Option<GeoPoint>,
}

/// Summary of a finished turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    /// Turn identifier.
    pub turn_id: TurnId,
    /// What kind of turn it was.
    pub kind: TurnKind,
    /// How it ended.
    pub outcome: TurnOutcome,
    /// Final assistant text with protocol markup removed.
    pub display_text: String,
    /// Journal entry created by an identification.
    pub entry: Option<JournalEntry>,
    /// Trade settlement, for trade turns that reached a verdict.
    pub settlement: Option<Settlement>,
    /// Achievements unlocked by the turn, in unlock order.
    pub unlocked: Vec<String>,
    /// User-facing error, if any.
    pub error: Option<String>,
}

impl TurnReport {
    fn new(turn_id: TurnId, kind: TurnKind, outcome: TurnOutcome) -> Self {
        Self {
            turn_id,
            kind,
            outcome,
            display_text: String::new(),
            entry: None,
            settlement: None,
            unlocked: Vec::new(),
            error: None,
        }
    }
}

/// A turn that was accepted and is running in the background.
#[derive(Debug)]
pub struct TurnHandle {
    turn_id: TurnId,
    task: JoinHandle<TurnReport>,
}

impl TurnHandle {
    /// The running turn's id.
    pub const fn turn_id(&self) -> TurnId {
        self.turn_id
    }

    /// Wait for the turn to end.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::TaskFailed`] if the turn task died.
    pub async fn finished(self) -> Result<TurnReport, EngineError> {
        self.task
            .await
            .map_err(|e| EngineError::TaskFailed(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Busy guard
// ---------------------------------------------------------------------------

/// Exclusive right to mutate; released on drop.
struct TurnTicket {
    inner: Arc<EngineInner>,
}

impl TurnTicket {
    fn acquire(inner: &Arc<EngineInner>) -> Result<Self, EngineError> {
        if inner
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(EngineError::Busy);
        }
        Ok(Self {
            inner: Arc::clone(inner),
        })
    }
}

impl Drop for TurnTicket {
    fn drop(&mut self) {
        self.inner.busy.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Persistence writer
// ---------------------------------------------------------------------------

enum PersistCommand {
    Save(Box<GameState>),
    Flush(oneshot::Sender<()>),
}

async fn run_writer(
    store: StateStore,
    mut commands: mpsc::UnboundedReceiver<PersistCommand>,
    events: broadcast::Sender<EngineEvent>,
) {
    while let Some(command) = commands.recv().await {
        match command {
            PersistCommand::Save(state) => {
                if let Err(e) = store.save(&state).await {
                    error!(error = %e, "failed to save game state");
                    let _ = events.send(EngineEvent::Error {
                        turn_id: None,
                        kind: ErrorKind::Persistence,
                        message: e.to_string(),
                    });
                }
            }
            PersistCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("persistence writer stopped");
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

struct EngineInner {
    settings: GameSettings,
    transport: Arc<dyn AssistantTransport>,
    state: RwLock<GameState>,
    conversation: RwLock<Vec<ChatMessage>>,
    events: broadcast::Sender<EngineEvent>,
    busy: AtomicBool,
    active: Mutex<Option<CancellationToken>>,
    store_items: Vec<StoreItem>,
    persist: mpsc::UnboundedSender<PersistCommand>,
}

/// Plan for one assistant turn, fixed when the intent is accepted.
struct TurnPlan {
    turn_id: TurnId,
    kind: TurnKind,
    request: TurnRequest,
    user_message: ChatMessage,
    trade: Option<TradeProposal>,
    token: CancellationToken,
}

/// How the stream ended.
enum StreamEnd {
    Completed,
    Failed(String),
    Cancelled,
}

/// The engine host. Cheap to clone; clones share one game.
#[derive(Clone)]
pub struct GameEngine {
    inner: Arc<EngineInner>,
}

impl std::fmt::Debug for GameEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameEngine")
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

impl GameEngine {
    /// Load the saved game and start the persistence writer.
    ///
    /// A fresh game is seeded with the counterpart inventory and listings
    /// when `settings.seed_catalog` is set.
    pub async fn start(
        settings: GameSettings,
        store: StateStore,
        transport: Arc<dyn AssistantTransport>,
    ) -> Self {
        let outcome = store.load().await;
        let mut state = outcome.state;
        let fresh = outcome.source == LoadSource::Fresh;
        if fresh && settings.seed_catalog {
            seed_state(&mut state);
        }
        info!(
            score = state.score,
            entries = state.journal_entries.len(),
            fresh,
            "game engine starting"
        );

        let (events, _) = broadcast::channel(settings.event_capacity.max(1));
        let (persist, commands) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(store, commands, events.clone()));

        let welcome = ChatMessage {
            author: MessageAuthor::Assistant,
            text: settings.welcome_message.clone(),
            image_url: None,
        };
        let engine = Self {
            inner: Arc::new(EngineInner {
                settings,
                transport,
                state: RwLock::new(state),
                conversation: RwLock::new(vec![welcome]),
                events,
                busy: AtomicBool::new(false),
                active: Mutex::new(None),
                store_items: catalog(),
                persist,
            }),
        };
        if fresh {
            engine.inner.persist(engine.inner.state.read().await.clone());
        }
        engine
    }

    // -----------------------------------------------------------------------
    // Turn intents
    // -----------------------------------------------------------------------

    /// Send a chat message, optionally with specimen photos.
    ///
    /// # Errors
    ///
    /// [`EngineError::Busy`] while another turn runs, or
    /// [`EngineError::EmptyMessage`] when there is nothing to send.
    pub async fn send_message(&self, message: UserMessage) -> Result<TurnHandle, EngineError> {
        if message.text.trim().is_empty() && message.images.is_empty() {
            return Err(EngineError::EmptyMessage);
        }
        let ticket = TurnTicket::acquire(&self.inner)?;
        let score = self.inner.state.read().await.score;
        let user_message = ChatMessage {
            author: MessageAuthor::User,
            text: message.text.clone(),
            image_url: message.images.first().map(ImageAttachment::data_url),
        };
        let request = TurnRequest::Chat {
            text: message.text,
            images: message.images,
            location: message.location,
            score,
            tier: DifficultyTier::for_score(score),
        };
        Ok(self
            .launch(ticket, TurnKind::Chat, request, user_message, None)
            .await)
    }

    /// Ask for a challenge matched to the collector's score and location.
    ///
    /// # Errors
    ///
    /// [`EngineError::Busy`] while another turn runs.
    pub async fn request_challenge(
        &self,
        location: Option<GeoPoint>,
    ) -> Result<TurnHandle, EngineError> {
        let ticket = TurnTicket::acquire(&self.inner)?;
        let score = self.inner.state.read().await.score;
        let request = TurnRequest::Challenge {
            location,
            score,
            tier: DifficultyTier::for_score(score),
        };
        let user_message = ChatMessage {
            author: MessageAuthor::User,
            text: CHALLENGE_PROMPT.to_owned(),
            image_url: None,
        };
        Ok(self
            .launch(ticket, TurnKind::Challenge, request, user_message, None)
            .await)
    }

    /// Ask the assistant to survey a point of interest.
    ///
    /// # Errors
    ///
    /// [`EngineError::Busy`] while another turn runs.
    pub async fn investigate(
        &self,
        point_of_interest: PointOfInterest,
        location: Option<GeoPoint>,
    ) -> Result<TurnHandle, EngineError> {
        let ticket = TurnTicket::acquire(&self.inner)?;
        let score = self.inner.state.read().await.score;
        let user_message = ChatMessage {
            author: MessageAuthor::User,
            text: format!("Investigate {}.", point_of_interest.name),
            image_url: None,
        };
        let request = TurnRequest::Investigation {
            point_of_interest,
            location,
            score,
        };
        Ok(self
            .launch(ticket, TurnKind::Investigation, request, user_message, None)
            .await)
    }

    /// Offer one journal entry for one counterpart entry.
    ///
    /// The proposal is validated before the assistant is consulted.
    ///
    /// # Errors
    ///
    /// [`EngineError::Busy`] while another turn runs, or
    /// [`EngineError::Trade`] when the proposal is invalid or unaffordable.
    pub async fn propose_trade(&self, proposal: TradeProposal) -> Result<TurnHandle, EngineError> {
        let ticket = TurnTicket::acquire(&self.inner)?;
        let (validated, score) = {
            let state = self.inner.state.read().await;
            (quote(&state, proposal)?, state.score)
        };
        let user_message = ChatMessage {
            author: MessageAuthor::User,
            text: format!(
                "I'd like to trade my {} for your {}.",
                validated.offered.name, validated.requested.name
            ),
            image_url: None,
        };
        let request = TurnRequest::TradeEvaluation {
            offered: validated.offered,
            requested: validated.requested,
            score,
        };
        Ok(self
            .launch(ticket, TurnKind::Trade, request, user_message, Some(proposal))
            .await)
    }

    /// Abort the running turn. Returns `false` when no turn is running.
    pub async fn cancel_turn(&self) -> bool {
        let active = self.inner.active.lock().await;
        active.as_ref().is_some_and(|token| {
            token.cancel();
            true
        })
    }

    async fn launch(
        &self,
        ticket: TurnTicket,
        kind: TurnKind,
        request: TurnRequest,
        user_message: ChatMessage,
        trade: Option<TradeProposal>,
    ) -> TurnHandle {
        let turn_id = TurnId::new();
        let token = CancellationToken::new();
        *self.inner.active.lock().await = Some(token.clone());

        let plan = TurnPlan {
            turn_id,
            kind,
            request,
            user_message,
            trade,
            token,
        };
        let span = info_span!("turn", turn_id = %turn_id, kind = ?kind);
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(
            async move {
                let report = Arc::clone(&inner).run_turn(plan).await;
                *inner.active.lock().await = None;
                drop(ticket);
                report
            }
            .instrument(span),
        );
        TurnHandle { turn_id, task }
    }

    // -----------------------------------------------------------------------
    // Simple mutations
    // -----------------------------------------------------------------------

    /// Buy a store item with score points.
    ///
    /// # Errors
    ///
    /// [`EngineError::Busy`] while a turn runs, or [`EngineError::Purchase`]
    /// when the item is unknown, owned or unaffordable.
    pub async fn purchase(&self, item_id: &str) -> Result<ScoreEntry, EngineError> {
        let _ticket = TurnTicket::acquire(&self.inner)?;
        let mut state = self.inner.state.write().await;
        let mut next = state.clone();
        let row = purchase(&mut next, &self.inner.store_items, item_id)?;
        let score = next.score;
        check_conservation(&next);
        *state = next;
        let snapshot = state.clone();
        drop(state);

        info!(item_id, price = row.delta.unsigned_abs(), score, "item purchased");
        self.inner.emit(EngineEvent::ItemPurchased {
            item_id: item_id.to_owned(),
            price: row.delta.unsigned_abs(),
            score,
        });
        self.inner.persist(snapshot);
        Ok(row)
    }

    /// Publish a land listing.
    ///
    /// # Errors
    ///
    /// [`EngineError::Busy`] while a turn runs.
    pub async fn create_listing(&self, draft: ListingDraft) -> Result<LandListing, EngineError> {
        let _ticket = TurnTicket::acquire(&self.inner)?;
        let mut state = self.inner.state.write().await;
        let listing = create_listing(&mut state, draft);
        let snapshot = state.clone();
        drop(state);

        info!(listing_id = %listing.id, property = %listing.property_name, "listing created");
        self.inner.emit(EngineEvent::ListingCreated {
            listing: Box::new(listing.clone()),
        });
        self.inner.persist(snapshot);
        Ok(listing)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Snapshot of the game state.
    pub async fn state(&self) -> GameState {
        self.inner.state.read().await.clone()
    }

    /// The visible conversation, oldest first.
    pub async fn conversation(&self) -> Vec<ChatMessage> {
        self.inner.conversation.read().await.clone()
    }

    /// Every achievement with its unlock status.
    pub async fn achievements(&self) -> Vec<AchievementStatus> {
        statuses(&self.inner.state.read().await.unlocked_achievements)
    }

    /// Land listings, newest first.
    pub async fn listings(&self) -> Vec<LandListing> {
        self.inner.state.read().await.listings.clone()
    }

    /// The store catalog.
    pub fn store_items(&self) -> &[StoreItem] {
        &self.inner.store_items
    }

    /// Whether the score ledger accounts for the score.
    pub async fn ledger_status(&self) -> ConservationResult {
        verify(&*self.inner.state.read().await)
    }

    /// Subscribe to outbound events.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.inner.events.subscribe()
    }

    /// Whether a turn or mutation holds the busy guard.
    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    /// Wait until every queued save has been written.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PersistenceClosed`] if the writer is gone.
    pub async fn flush(&self) -> Result<(), EngineError> {
        let (done, waiter) = oneshot::channel();
        self.inner
            .persist
            .send(PersistCommand::Flush(done))
            .ok()
            .ok_or(EngineError::PersistenceClosed)?;
        waiter.await.ok().ok_or(EngineError::PersistenceClosed)
    }
}

// ---------------------------------------------------------------------------
// Turn execution
// ---------------------------------------------------------------------------

impl EngineInner {
    fn emit(&self, event: EngineEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn phase(&self, turn_id: TurnId, phase: TurnPhase) {
        debug!(phase = ?phase, "turn phase");
        self.emit(EngineEvent::PhaseChanged { turn_id, phase });
    }

    fn persist(&self, snapshot: GameState) {
        if self
            .persist
            .send(PersistCommand::Save(Box::new(snapshot)))
            .is_err()
        {
            warn!("persistence writer stopped, state not saved");
        }
    }

    async fn run_turn(self: Arc<Self>, plan: TurnPlan) -> TurnReport {
        let TurnPlan {
            turn_id,
            kind,
            request,
            user_message,
            trade,
            token,
        } = plan;
        info!("turn started");
        self.emit(EngineEvent::TurnStarted { turn_id, kind });

        let image_url = user_message.image_url.clone();
        let (history, checkpoint) = {
            let mut conversation = self.conversation.write().await;
            let history = conversation.clone();
            let checkpoint = conversation.len();
            conversation.push(user_message);
            conversation.push(ChatMessage {
                author: MessageAuthor::Assistant,
                text: String::new(),
                image_url: None,
            });
            (history, checkpoint)
        };

        if self.settings.require_location && request.needs_location() && request.location().is_none()
        {
            return self
                .abandon(turn_id, kind, checkpoint, StreamEnd::Failed(LOCATION_UNAVAILABLE.to_owned()))
                .await;
        }

        self.phase(turn_id, TurnPhase::Streaming);
        let expected = if trade.is_some() {
            ExpectedPayload::TradeVerdict
        } else {
            ExpectedPayload::Identification
        };
        let mut accumulator = StreamAccumulator::new();
        let mut extractor = TagExtractor::new(expected);
        let mut stream = self.transport.stream_reply(request, history);

        let end = loop {
            let item = tokio::select! {
                biased;
                () = token.cancelled() => break StreamEnd::Cancelled,
                item = stream.next() => item,
            };
            match item {
                None => break StreamEnd::Completed,
                Some(Err(e)) => {
                    warn!(error = %e, "assistant stream failed");
                    break StreamEnd::Failed(format!("{TRANSPORT_FAILED} ({e})"));
                }
                Some(Ok(fragment)) => {
                    if fragment.is_empty() {
                        continue;
                    }
                    let extraction = extractor.feed(accumulator.append(&fragment));
                    self.show(checkpoint, &extraction.display_text).await;
                    self.emit(EngineEvent::DisplayText {
                        turn_id,
                        text: extraction.display_text,
                    });
                }
            }
        };
        drop(stream);

        if !matches!(end, StreamEnd::Completed) {
            return self.abandon(turn_id, kind, checkpoint, end).await;
        }

        self.phase(turn_id, TurnPhase::Extracting);
        let extraction = extractor.finish(accumulator.transcript());
        self.show(checkpoint, &extraction.display_text).await;
        debug!(
            fragments = accumulator.fragment_count(),
            bytes = accumulator.transcript().len(),
            "reply complete"
        );
        if let Some(payload) = extraction.payload() {
            self.emit(EngineEvent::PayloadDetected {
                turn_id,
                payload: payload.clone(),
            });
        }

        let report = match trade {
            Some(proposal) => self.settle_trade(turn_id, proposal, extraction).await,
            None => self.apply_identification(turn_id, kind, extraction, image_url).await,
        };

        self.phase(turn_id, TurnPhase::Idle);
        self.emit(EngineEvent::TurnEnded {
            turn_id,
            outcome: report.outcome,
        });
        info!(outcome = ?report.outcome, "turn ended");
        report
    }

    /// Replace the assistant placeholder's text.
    async fn show(&self, checkpoint: usize, text: &str) {
        let mut conversation = self.conversation.write().await;
        if let Some(message) = conversation.get_mut(checkpoint.saturating_add(1)) {
            text.clone_into(&mut message.text);
        }
    }

    async fn abandon(
        &self,
        turn_id: TurnId,
        kind: TurnKind,
        checkpoint: usize,
        end: StreamEnd,
    ) -> TurnReport {
        self.conversation.write().await.truncate(checkpoint);
        let mut report = TurnReport::new(turn_id, kind, TurnOutcome::Failed);
        match end {
            StreamEnd::Cancelled => {
                info!("turn cancelled");
                report.outcome = TurnOutcome::Cancelled;
            }
            StreamEnd::Failed(message) => {
                self.emit(EngineEvent::Error {
                    turn_id: Some(turn_id),
                    kind: ErrorKind::Transport,
                    message: message.clone(),
                });
                report.error = Some(message);
            }
            StreamEnd::Completed => {}
        }
        self.phase(turn_id, TurnPhase::Idle);
        self.emit(EngineEvent::TurnEnded {
            turn_id,
            outcome: report.outcome,
        });
        report
    }

    async fn apply_identification(
        &self,
        turn_id: TurnId,
        kind: TurnKind,
        extraction: Extraction,
        image_url: Option<String>,
    ) -> TurnReport {
        let mut report = TurnReport::new(turn_id, kind, TurnOutcome::NoChange);
        let payload = match extraction.status {
            PayloadStatus::Complete(payload) => payload,
            PayloadStatus::Absent => {
                self.phase(turn_id, TurnPhase::NoPayload);
                report.display_text = extraction.display_text;
                return report;
            }
            PayloadStatus::Malformed(e) => {
                self.phase(turn_id, TurnPhase::NoPayload);
                warn!(error = %e, "malformed analysis payload");
                let message = format!("The specimen analysis could not be read: {e}");
                self.emit(EngineEvent::Error {
                    turn_id: Some(turn_id),
                    kind: ErrorKind::MalformedPayload,
                    message: message.clone(),
                });
                report.display_text = extraction.display_text;
                report.error = Some(message);
                return report;
            }
        };

        let Some(image_url) = image_url else {
            self.phase(turn_id, TurnPhase::NoPayload);
            info!(
                payload = ?payload_name(&payload),
                "identification without a photo, nothing recorded"
            );
            report.display_text = extraction.display_text;
            return report;
        };

        self.phase(turn_id, TurnPhase::ReconcilingIdentification);
        let mut state = self.state.write().await;
        let mut next = state.clone();
        let committed = reconcile(&payload, next.score, &extraction.display_text, &image_url)
            .and_then(|reconciliation| {
                commit(&mut next, &reconciliation)?;
                Ok(reconciliation.entry)
            })
            .and_then(|entry| {
                self.phase(turn_id, TurnPhase::EvaluatingAchievements);
                settle_unlocks(&mut next).map(|batches| (entry, batches))
            });

        report.display_text = extraction.display_text;
        match committed {
            Ok((entry, batches)) => {
                check_conservation(&next);
                *state = next;
                let snapshot = state.clone();
                drop(state);

                let score_after_entry = score_before_bonuses(&snapshot, &batches);
                self.emit(EngineEvent::JournalEntryCreated {
                    turn_id,
                    entry: Box::new(entry.clone()),
                    score: score_after_entry,
                });
                report.unlocked = self.announce_unlocks(&batches, score_after_entry);
                self.persist(snapshot);
                report.entry = Some(entry);
                report.outcome = TurnOutcome::Committed;
            }
            Err(e) => {
                drop(state);
                error!(error = %e, payload = ?payload_name(&payload), "identification rejected");
                self.emit(EngineEvent::Error {
                    turn_id: Some(turn_id),
                    kind: ErrorKind::Rejected,
                    message: e.to_string(),
                });
                report.outcome = TurnOutcome::Failed;
                report.error = Some(e.to_string());
            }
        }
        report
    }

    async fn settle_trade(
        &self,
        turn_id: TurnId,
        proposal: TradeProposal,
        extraction: Extraction,
    ) -> TurnReport {
        let mut report = TurnReport::new(turn_id, TurnKind::Trade, TurnOutcome::NoChange);
        let accepted = match &extraction.status {
            PayloadStatus::Complete(ProtocolPayload::TradeVerdict { accepted }) => *accepted,
            PayloadStatus::Malformed(e) => {
                warn!(error = %e, "malformed trade verdict, treating as declined");
                false
            }
            PayloadStatus::Complete(_) | PayloadStatus::Absent => false,
        };

        self.phase(turn_id, TurnPhase::SettlingTrade);
        let mut state = self.state.write().await;
        let mut next = state.clone();
        let settled = settle(&mut next, proposal, accepted)
            .map_err(|e| e.to_string())
            .and_then(|settlement| {
                if !settlement.accepted {
                    return Ok((settlement, Vec::new()));
                }
                self.phase(turn_id, TurnPhase::EvaluatingAchievements);
                settle_unlocks(&mut next)
                    .map(|batches| (settlement, batches))
                    .map_err(|e| e.to_string())
            });

        report.display_text.clone_from(&extraction.display_text);
        match settled {
            Ok((settlement, batches)) => {
                let snapshot = settlement.accepted.then(|| {
                    check_conservation(&next);
                    *state = next;
                    state.clone()
                });
                drop(state);

                self.emit(EngineEvent::TradeVerdict {
                    turn_id,
                    accepted: settlement.accepted,
                    rationale: extraction.display_text,
                    score_delta: settlement.score_delta,
                });
                if let Some(snapshot) = snapshot {
                    let score = score_before_bonuses(&snapshot, &batches);
                    report.unlocked = self.announce_unlocks(&batches, score);
                    self.persist(snapshot);
                    report.outcome = TurnOutcome::Committed;
                }
                report.settlement = Some(settlement);
            }
            Err(message) => {
                drop(state);
                warn!(error = %message, "trade could not be settled");
                self.emit(EngineEvent::Error {
                    turn_id: Some(turn_id),
                    kind: ErrorKind::Rejected,
                    message: message.clone(),
                });
                report.outcome = TurnOutcome::Failed;
                report.error = Some(message);
            }
        }
        report
    }

    /// Emit one event per batch, with the score after that batch.
    fn announce_unlocks(&self, batches: &[Unlocks], mut score: u64) -> Vec<String> {
        let mut unlocked = Vec::new();
        for batch in batches {
            score = score.saturating_add(batch.bonus);
            self.emit(EngineEvent::AchievementsUnlocked {
                ids: batch.ids.clone(),
                bonus: batch.bonus,
                score,
            });
            unlocked.extend(batch.ids.iter().cloned());
        }
        unlocked
    }
}

fn check_conservation(state: &GameState) {
    if let ConservationResult::Anomaly(anomaly) = verify(state) {
        warn!(anomaly = %anomaly, "score ledger out of balance");
    }
}

/// The committed score minus every batch bonus.
fn score_before_bonuses(state: &GameState, batches: &[Unlocks]) -> u64 {
    batches
        .iter()
        .fold(state.score, |score, batch| score.saturating_sub(batch.bonus))
}

fn payload_name(payload: &ProtocolPayload) -> Option<&str> {
    match payload {
        ProtocolPayload::Identification { name, .. }
        | ProtocolPayload::IdentificationJson { name, .. } => Some(name.as_str()),
        ProtocolPayload::TradeVerdict { .. } => None,
    }
}
