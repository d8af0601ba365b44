//! Streaming assistant transport for `RockHound`.
//!
//! Implements [`rockhound_core::AssistantTransport`] on top of a hosted LLM.
//! Prompts are rendered from `minijinja` templates, sent to an
//! OpenAI-compatible or Anthropic endpoint with streaming enabled, and the
//! server-sent events are decoded back into plain text fragments.
//!
//! # Architecture
//!
//! ```text
//! TurnRequest ──► PromptEngine ──► LlmBackend ──► SSE body
//!                                                    │
//!   engine ◄── text fragments ◄── Dialect ◄── SseDecoder
//! ```
//!
//! # Modules
//!
//! - [`client`]: the transport the engine holds
//! - [`llm`]: request bodies and HTTP calls per backend
//! - [`prompt`]: template loading and rendering
//! - [`sse`]: event-stream decoding
//! - [`error`]: error types

pub mod client;
pub mod error;
pub mod llm;
pub mod prompt;
pub mod sse;

pub use client::AssistantClient;
pub use error::AssistantError;
pub use llm::LlmBackend;
pub use prompt::{PromptEngine, RenderedPrompt};
