//! Streaming LLM backends.
//!
//! Enum dispatch over the two supported wire dialects. Both backends POST a
//! streaming request and hand back the raw response; decoding into text
//! fragments happens in [`crate::client`].

use rockhound_core::config::{AssistantConfig, BackendKind};
use rockhound_types::{ChatMessage, ImageAttachment, MessageAuthor};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::AssistantError;
use crate::prompt::RenderedPrompt;
use crate::sse::Dialect;

/// Everything one request needs besides the backend settings.
#[derive(Debug, Clone)]
pub struct ReplyRequest {
    /// Rendered system prompt and user message.
    pub prompt: RenderedPrompt,
    /// Images attached to the user message.
    pub images: Vec<ImageAttachment>,
    /// Earlier conversation, oldest first.
    pub history: Vec<ChatMessage>,
}

/// An LLM backend that streams a reply.
///
/// Uses enum dispatch instead of trait objects because async methods are
/// not dyn-compatible.
#[derive(Debug)]
pub enum LlmBackend {
    /// OpenAI-compatible chat completions API.
    OpenAi(OpenAiBackend),
    /// Anthropic Messages API.
    Anthropic(AnthropicBackend),
}

impl LlmBackend {
    /// Build the backend selected in the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Config`] when no API key is configured.
    pub fn from_config(config: &AssistantConfig) -> Result<Self, AssistantError> {
        let settings = BackendSettings::from_config(config)?;
        Ok(match config.backend {
            BackendKind::OpenAi => Self::OpenAi(OpenAiBackend { settings }),
            BackendKind::Anthropic => Self::Anthropic(AnthropicBackend { settings }),
        })
    }

    /// Send the request and return the streaming response.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Backend`] if the call fails, or
    /// [`AssistantError::Status`] on a non-success status.
    pub async fn open(&self, request: &ReplyRequest) -> Result<reqwest::Response, AssistantError> {
        let (settings, url, body) = match self {
            Self::OpenAi(backend) => (
                &backend.settings,
                format!("{}/chat/completions", backend.settings.api_url),
                backend.body(request),
            ),
            Self::Anthropic(backend) => (
                &backend.settings,
                format!("{}/messages", backend.settings.api_url),
                backend.body(request),
            ),
        };
        debug!(backend = self.name(), url = %url, model = %settings.model, "opening reply stream");

        let mut builder = settings
            .client
            .post(&url)
            .header("Accept", "text/event-stream");
        builder = match self {
            Self::OpenAi(_) => {
                builder.header("Authorization", format!("Bearer {}", settings.api_key))
            }
            Self::Anthropic(_) => builder
                .header("x-api-key", &settings.api_key)
                .header("anthropic-version", "2023-06-01"),
        };

        let response = builder
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::Backend(format!("{} request failed: {e}", self.name())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("unable to read error body: {e}"));
            return Err(AssistantError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Event vocabulary of the backend's stream.
    pub const fn dialect(&self) -> Dialect {
        match self {
            Self::OpenAi(_) => Dialect::OpenAi,
            Self::Anthropic(_) => Dialect::Anthropic,
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
        }
    }
}

/// Connection settings shared by both dialects.
#[derive(Debug)]
struct BackendSettings {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl BackendSettings {
    fn from_config(config: &AssistantConfig) -> Result<Self, AssistantError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                AssistantError::Config("assistant.api_key (or ROCKHOUND_API_KEY) is not set".to_owned())
            })?;
        Ok(Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible backend
// ---------------------------------------------------------------------------

/// Backend for OpenAI-compatible chat completions APIs.
///
/// Sends requests to `{api_url}/chat/completions` with `stream: true`.
#[derive(Debug)]
pub struct OpenAiBackend {
    settings: BackendSettings,
}

impl OpenAiBackend {
    fn body(&self, request: &ReplyRequest) -> Value {
        let mut messages = vec![json!({"role": "system", "content": request.prompt.system})];
        messages.extend(history_messages(&request.history));

        let content = if request.images.is_empty() {
            json!(request.prompt.user)
        } else {
            let mut parts = vec![json!({"type": "text", "text": request.prompt.user})];
            parts.extend(request.images.iter().map(|image| {
                json!({"type": "image_url", "image_url": {"url": image.data_url()}})
            }));
            Value::Array(parts)
        };
        messages.push(json!({"role": "user", "content": content}));

        json!({
            "model": self.settings.model,
            "messages": messages,
            "temperature": self.settings.temperature,
            "max_tokens": self.settings.max_tokens,
            "stream": true
        })
    }
}

// ---------------------------------------------------------------------------
// Anthropic Messages API backend
// ---------------------------------------------------------------------------

/// Backend for the Anthropic Messages API.
///
/// The system prompt is a top-level field, the conversation must open with
/// a user message, and images go before the text.
#[derive(Debug)]
pub struct AnthropicBackend {
    settings: BackendSettings,
}

impl AnthropicBackend {
    fn body(&self, request: &ReplyRequest) -> Value {
        let opening = request
            .history
            .iter()
            .position(|message| message.author == MessageAuthor::User)
            .unwrap_or(request.history.len());
        let mut messages: Vec<Value> = history_messages(request.history.get(opening..).unwrap_or(&[]));

        let mut parts: Vec<Value> = request
            .images
            .iter()
            .map(|image| {
                json!({
                    "type": "image",
                    "source": {"type": "base64", "media_type": image.mime_type, "data": image.data}
                })
            })
            .collect();
        parts.push(json!({"type": "text", "text": request.prompt.user}));
        messages.push(json!({"role": "user", "content": parts}));

        json!({
            "model": self.settings.model,
            "max_tokens": self.settings.max_tokens,
            "temperature": self.settings.temperature,
            "system": request.prompt.system,
            "messages": messages,
            "stream": true
        })
    }
}

fn history_messages(history: &[ChatMessage]) -> Vec<Value> {
    history
        .iter()
        .filter(|message| !message.text.trim().is_empty())
        .map(|message| {
            let role = match message.author {
                MessageAuthor::User => "user",
                MessageAuthor::Assistant => "assistant",
            };
            json!({"role": role, "content": message.text})
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(backend: BackendKind) -> AssistantConfig {
        AssistantConfig {
            backend,
            api_key: Some("sk-test".to_owned()),
            api_url: "http://localhost:9/v1/".to_owned(),
            ..AssistantConfig::default()
        }
    }

    fn request() -> ReplyRequest {
        ReplyRequest {
            prompt: RenderedPrompt {
                system: "be a rockhound".to_owned(),
                user: "what is this?".to_owned(),
            },
            images: vec![ImageAttachment {
                mime_type: "image/png".to_owned(),
                data: "iVBOR".to_owned(),
            }],
            history: vec![
                ChatMessage {
                    author: MessageAuthor::Assistant,
                    text: "Welcome!".to_owned(),
                    image_url: None,
                },
                ChatMessage {
                    author: MessageAuthor::User,
                    text: "hi".to_owned(),
                    image_url: None,
                },
                ChatMessage {
                    author: MessageAuthor::Assistant,
                    text: "hello".to_owned(),
                    image_url: None,
                },
            ],
        }
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let mut config = config(BackendKind::OpenAi);
        config.api_key = None;
        assert!(matches!(
            LlmBackend::from_config(&config),
            Err(AssistantError::Config(_))
        ));
    }

    #[test]
    fn openai_body_carries_history_and_images() {
        let Ok(LlmBackend::OpenAi(backend)) = LlmBackend::from_config(&config(BackendKind::OpenAi))
        else {
            return;
        };
        assert_eq!(backend.settings.api_url, "http://localhost:9/v1");
        let body = backend.body(&request());
        let messages = body.get("messages").and_then(Value::as_array);
        assert_eq!(messages.map(Vec::len), Some(5));
        assert_eq!(body.get("stream"), Some(&json!(true)));
        assert_eq!(
            body.pointer("/messages/4/content/1/image_url/url"),
            Some(&json!("data:image/png;base64,iVBOR"))
        );
    }

    #[test]
    fn anthropic_body_opens_with_user() {
        let Ok(LlmBackend::Anthropic(backend)) =
            LlmBackend::from_config(&config(BackendKind::Anthropic))
        else {
            return;
        };
        let body = backend.body(&request());
        assert_eq!(body.pointer("/messages/0/role"), Some(&json!("user")));
        assert_eq!(body.pointer("/messages/2/content/0/type"), Some(&json!("image")));
        assert_eq!(body.get("system"), Some(&json!("be a rockhound")));
    }
}
