//! Prompt template loading and rendering via `minijinja`.
//!
//! Templates are loaded from the filesystem (default: `templates/`) so the
//! assistant persona and the protocol instructions can be tuned without
//! recompiling. One template renders the system prompt; each turn kind has
//! its own user-message template.

use std::path::Path;

use minijinja::Environment;
use rockhound_core::TurnRequest;
use rockhound_types::{GeoPoint, Rarity};
use serde_json::json;

use crate::error::AssistantError;

const TEMPLATES: [&str; 5] = ["system", "chat", "challenge", "investigation", "trade"];

/// Manages prompt template loading and rendering.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl std::fmt::Debug for PromptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptEngine").finish_non_exhaustive()
    }
}

/// A rendered prompt ready to send to an LLM backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    /// System message establishing the persona and the reply protocol.
    pub system: String,
    /// User message for this turn.
    pub user: String,
}

impl PromptEngine {
    /// Load templates from `templates_dir`.
    ///
    /// The directory must contain `system.j2`, `chat.j2`, `challenge.j2`,
    /// `investigation.j2` and `trade.j2`.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Template`] if a file is missing or does not
    /// compile.
    pub fn new(templates_dir: &Path) -> Result<Self, AssistantError> {
        let mut env = Environment::new();
        for name in TEMPLATES {
            let path = templates_dir.join(format!("{name}.j2"));
            let source = std::fs::read_to_string(&path).map_err(|e| {
                AssistantError::Template(format!("failed to read {}: {e}", path.display()))
            })?;
            env.add_template_owned(name, source)
                .map_err(|e| AssistantError::Template(format!("failed to add {name} template: {e}")))?;
        }
        Ok(Self { env })
    }

    /// Render the system prompt and the user message for one turn.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Template`] if rendering fails.
    pub fn render(&self, request: &TurnRequest) -> Result<RenderedPrompt, AssistantError> {
        let (name, score, location) = match request {
            TurnRequest::Chat {
                score, location, ..
            } => ("chat", *score, *location),
            TurnRequest::Challenge {
                score, location, ..
            } => ("challenge", *score, *location),
            TurnRequest::Investigation {
                score, location, ..
            } => ("investigation", *score, *location),
            TurnRequest::TradeEvaluation { score, .. } => ("trade", *score, None),
        };

        let rarities: Vec<_> = Rarity::KNOWN
            .iter()
            .map(|rarity| json!({ "name": rarity.as_str(), "points": rarity.base_points() }))
            .collect();
        let context = json!({
            "request": request,
            "score": score,
            "location_context": location_context(location, score),
            "rarities": rarities,
        });

        Ok(RenderedPrompt {
            system: self.render_one("system", &context)?,
            user: self.render_one(name, &context)?,
        })
    }

    fn render_one(&self, name: &str, context: &serde_json::Value) -> Result<String, AssistantError> {
        self.env
            .get_template(name)
            .map_err(|e| AssistantError::Template(format!("missing {name} template: {e}")))?
            .render(context)
            .map(|text| text.trim().to_owned())
            .map_err(|e| AssistantError::Template(format!("{name} render failed: {e}")))
    }
}

/// The sentence appended to location-aware prompts.
pub fn location_context(location: Option<GeoPoint>, score: u64) -> String {
    location.map_or_else(
        || format!("My current score is {score}."),
        |point| {
            format!(
                "My current location is Latitude: {}, Longitude: {}. My current score is {score}.",
                point.latitude, point.longitude
            )
        },
    )
}
