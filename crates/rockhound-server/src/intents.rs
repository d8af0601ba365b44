//! REST handlers for collector intents.
//!
//! Turn intents are checked synchronously (busy guard, request
//! validation, trade quote) and answered with `202 Accepted` and the turn
//! id. The turn itself runs in the engine's background task; its progress
//! and result arrive over `/ws/events`.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/messages` | Chat, optionally with specimen photos |
//! | `POST` | `/api/challenges` | Ask for a location-based challenge |
//! | `POST` | `/api/investigations` | Survey a point of interest |
//! | `POST` | `/api/trades` | Propose a specimen swap |
//! | `DELETE` | `/api/turn` | Cancel the running turn |
//! | `POST` | `/api/purchases/{item_id}` | Buy a store item |
//! | `POST` | `/api/listings` | Publish a land access listing |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use rockhound_collection::{ListingDraft, TradeProposal};
use rockhound_core::{TurnHandle, UserMessage};
use rockhound_types::{GeoPoint, ImageAttachment, JournalEntryId, PointOfInterest, TurnId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use validator::Validate;

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// A latitude/longitude pair in a request body.
#[derive(Debug, Clone, Copy, Deserialize, Validate)]
pub struct LocationBody {
    /// Degrees north.
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    /// Degrees east.
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

impl From<LocationBody> for GeoPoint {
    fn from(body: LocationBody) -> Self {
        Self {
            latitude: body.latitude,
            longitude: body.longitude,
        }
    }
}

/// A base64-encoded photo.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ImageBody {
    /// MIME type, e.g. `image/jpeg`.
    #[validate(length(min = 1, max = 100))]
    pub mime_type: String,
    /// Base64 payload without the `data:` prefix.
    #[validate(length(min = 1))]
    pub data: String,
}

/// Request body for `POST /api/messages`.
#[derive(Debug, Deserialize, Validate)]
pub struct MessageRequest {
    /// What the collector typed.
    #[serde(default)]
    #[validate(length(max = 4000))]
    pub text: String,
    /// Specimen photos.
    #[serde(default)]
    #[validate(length(max = 8), nested)]
    pub images: Vec<ImageBody>,
    /// Current position.
    #[validate(nested)]
    pub location: Option<LocationBody>,
}

/// Request body for `POST /api/challenges`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ChallengeRequest {
    /// Current position.
    #[validate(nested)]
    pub location: Option<LocationBody>,
}

/// Request body for `POST /api/investigations`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InvestigationRequest {
    /// Name of the spot.
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    /// Notes about the spot.
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    /// Where the spot is.
    #[validate(nested)]
    pub point: LocationBody,
    /// Where the collector is.
    #[validate(nested)]
    pub location: Option<LocationBody>,
}

/// Request body for `POST /api/trades`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TradeRequest {
    /// Journal entry the collector offers.
    pub offered: JournalEntryId,
    /// Counterpart entry the collector wants.
    pub requested: JournalEntryId,
}

/// Request body for `POST /api/listings`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListingRequest {
    /// Property name.
    #[validate(length(min = 1, max = 200))]
    pub property_name: String,
    /// Owner's name.
    #[validate(length(min = 1, max = 200))]
    pub land_owner_name: String,
    /// Free-text location.
    #[validate(length(min = 1, max = 500))]
    pub location: String,
    /// Access fee in dollars.
    #[serde(default)]
    pub fee: u64,
    /// Minerals known to occur there.
    #[serde(default)]
    #[validate(length(max = 50))]
    pub minerals_known: Vec<String>,
    /// Visitor rules.
    #[serde(default)]
    #[validate(length(max = 4000))]
    pub access_rules: String,
    /// Anything else.
    #[serde(default)]
    #[validate(length(max = 4000))]
    pub additional_notes: String,
    /// Photo URL.
    #[validate(url)]
    pub image_url: Option<String>,
}

/// Response body for accepted turns.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TurnAccepted {
    turn_id: TurnId,
}

/// Response body for `DELETE /api/turn`.
#[derive(Debug, Serialize)]
struct CancelResponse {
    cancelled: bool,
}

fn accepted(handle: &TurnHandle) -> (StatusCode, Json<TurnAccepted>) {
    (
        StatusCode::ACCEPTED,
        Json(TurnAccepted {
            turn_id: handle.turn_id(),
        }),
    )
}

// ---------------------------------------------------------------------------
// Turn intents
// ---------------------------------------------------------------------------

/// Start a chat turn.
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()?;
    let message = UserMessage {
        text: body.text,
        images: body
            .images
            .into_iter()
            .map(|image| ImageAttachment {
                mime_type: image.mime_type,
                data: image.data,
            })
            .collect(),
        location: body.location.map(GeoPoint::from),
    };
    let handle = state.engine.send_message(message).await?;
    debug!(turn_id = %handle.turn_id().0, "chat turn accepted");
    Ok(accepted(&handle))
}

/// Start a challenge turn.
pub async fn post_challenge(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChallengeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()?;
    let handle = state
        .engine
        .request_challenge(body.location.map(GeoPoint::from))
        .await?;
    debug!(turn_id = %handle.turn_id().0, "challenge turn accepted");
    Ok(accepted(&handle))
}

/// Start an investigation turn.
pub async fn post_investigation(
    State(state): State<Arc<AppState>>,
    Json(body): Json<InvestigationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()?;
    let point_of_interest = PointOfInterest {
        name: body.name,
        description: body.description,
        location: body.point.into(),
    };
    let handle = state
        .engine
        .investigate(point_of_interest, body.location.map(GeoPoint::from))
        .await?;
    debug!(turn_id = %handle.turn_id().0, "investigation turn accepted");
    Ok(accepted(&handle))
}

/// Validate a trade proposal and start the evaluation turn.
pub async fn post_trade(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TradeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let proposal = TradeProposal {
        offered: body.offered,
        requested: body.requested,
    };
    let handle = state.engine.propose_trade(proposal).await?;
    debug!(turn_id = %handle.turn_id().0, "trade turn accepted");
    Ok(accepted(&handle))
}

/// Cancel the running turn, if any.
pub async fn delete_turn(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cancelled = state.engine.cancel_turn().await;
    if cancelled {
        info!("running turn cancelled by client");
    }
    Json(CancelResponse { cancelled })
}

// ---------------------------------------------------------------------------
// Direct mutations
// ---------------------------------------------------------------------------

/// Buy a store item and return the ledger row.
pub async fn post_purchase(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = state.engine.purchase(&item_id).await?;
    Ok(Json(entry))
}

/// Publish a land access listing.
pub async fn post_listing(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ListingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()?;
    let draft = ListingDraft {
        property_name: body.property_name,
        land_owner_name: body.land_owner_name,
        location: body.location,
        fee: body.fee,
        minerals_known: body.minerals_known,
        access_rules: body.access_rules,
        additional_notes: body.additional_notes,
        image_url: body.image_url,
    };
    let listing = state.engine.create_listing(draft).await?;
    Ok((StatusCode::CREATED, Json(listing)))
}
