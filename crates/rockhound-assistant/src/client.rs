//! The [`AssistantTransport`] implementation the engine talks to.
//!
//! A reply is a small state machine driven by `futures::stream::unfold`:
//! connect, then pull body chunks through the SSE decoder until the dialect
//! reports completion or the body ends.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use rockhound_core::config::AssistantConfig;
use rockhound_core::{AssistantTransport, ReplyStream, TransportError, TurnRequest};
use rockhound_types::ChatMessage;
use tracing::{debug, warn};

use crate::error::AssistantError;
use crate::llm::{LlmBackend, ReplyRequest};
use crate::prompt::PromptEngine;
use crate::sse::{Delta, Dialect, SseDecoder, SseEvent};

/// Streams assistant replies from an LLM backend.
#[derive(Debug, Clone)]
pub struct AssistantClient {
    backend: Arc<LlmBackend>,
    prompts: Arc<PromptEngine>,
}

impl AssistantClient {
    /// Combine a backend with a prompt engine.
    pub fn new(backend: LlmBackend, prompts: PromptEngine) -> Self {
        Self {
            backend: Arc::new(backend),
            prompts: Arc::new(prompts),
        }
    }

    /// Build the backend and load the templates named in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or a template cannot be
    /// loaded.
    pub fn from_config(config: &AssistantConfig) -> Result<Self, AssistantError> {
        let backend = LlmBackend::from_config(config)?;
        let prompts = PromptEngine::new(&config.templates_dir)?;
        Ok(Self::new(backend, prompts))
    }

    /// Name of the configured backend.
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }
}

impl AssistantTransport for AssistantClient {
    fn stream_reply(&self, request: TurnRequest, history: Vec<ChatMessage>) -> ReplyStream {
        let prompt = match self.prompts.render(&request) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(error = %e, "failed to render prompt");
                return stream::once(async move { Err(TransportError::from(e)) }).boxed();
            }
        };
        let images = match request {
            TurnRequest::Chat { images, .. } => images,
            TurnRequest::Challenge { .. }
            | TurnRequest::Investigation { .. }
            | TurnRequest::TradeEvaluation { .. } => Vec::new(),
        };
        let state = ReplyState::Connect {
            backend: Arc::clone(&self.backend),
            request: ReplyRequest {
                prompt,
                images,
                history,
            },
        };
        stream::unfold(state, next_fragment).boxed()
    }
}

// ---------------------------------------------------------------------------
// Reply state machine
// ---------------------------------------------------------------------------

enum ReplyState {
    Connect {
        backend: Arc<LlmBackend>,
        request: ReplyRequest,
    },
    Streaming(Box<Reply>),
    Done,
}

struct Reply {
    body: BoxStream<'static, Result<Vec<u8>, reqwest::Error>>,
    decoder: SseDecoder,
    dialect: Dialect,
    pending: VecDeque<Result<String, TransportError>>,
    closed: bool,
}

impl Reply {
    fn new(response: reqwest::Response, dialect: Dialect) -> Self {
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
            .boxed();
        Self {
            body,
            decoder: SseDecoder::new(),
            dialect,
            pending: VecDeque::new(),
            closed: false,
        }
    }

    fn absorb(&mut self, event: &SseEvent) {
        if self.closed {
            return;
        }
        match self.dialect.delta(event) {
            Delta::Text(text) => self.pending.push_back(Ok(text)),
            Delta::Done => self.closed = true,
            Delta::Error(message) => {
                self.pending
                    .push_back(Err(AssistantError::Stream(message).into()));
                self.closed = true;
            }
            Delta::Skip => {}
        }
    }
}

async fn next_fragment(
    state: ReplyState,
) -> Option<(Result<String, TransportError>, ReplyState)> {
    let mut reply = match state {
        ReplyState::Done => return None,
        ReplyState::Streaming(reply) => reply,
        ReplyState::Connect { backend, request } => match backend.open(&request).await {
            Ok(response) => {
                debug!(backend = backend.name(), "reply stream opened");
                Box::new(Reply::new(response, backend.dialect()))
            }
            Err(e) => {
                warn!(backend = backend.name(), error = %e, "failed to open reply stream");
                return Some((Err(e.into()), ReplyState::Done));
            }
        },
    };

    loop {
        if let Some(item) = reply.pending.pop_front() {
            let next = if item.is_ok() {
                ReplyState::Streaming(reply)
            } else {
                ReplyState::Done
            };
            return Some((item, next));
        }
        if reply.closed {
            return None;
        }
        match reply.body.next().await {
            Some(Ok(chunk)) => {
                for event in reply.decoder.push(&chunk) {
                    reply.absorb(&event);
                }
            }
            Some(Err(e)) => {
                warn!(error = %e, "reply stream broke off");
                reply
                    .pending
                    .push_back(Err(TransportError::Aborted(e.to_string())));
                reply.closed = true;
            }
            None => {
                if let Some(event) = reply.decoder.finish() {
                    reply.absorb(&event);
                }
                reply.closed = true;
            }
        }
    }
}
