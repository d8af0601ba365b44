//! The assistant's embedded micro-protocol.
//!
//! Assistant replies are free prose with game facts tucked into bracketed
//! tags or a JSON block. This crate turns a streamed reply into display
//! text plus a typed [`ProtocolPayload`](rockhound_types::ProtocolPayload).
//!
//! # Architecture
//!
//! ```text
//! fragments --> StreamAccumulator --> transcript
//!                                        |
//!                                        v
//!                               TagExtractor::feed   (per fragment, incremental)
//!                               TagExtractor::finish (end of stream)
//!                                        |
//!                                        v
//!                          Extraction { display_text, status }
//! ```
//!
//! # Modules
//!
//! - [`accumulator`] -- Fragment buffering
//! - [`scanner`] -- Tag grammar and the resumable scanner
//! - [`extractor`] -- Payload resolution and display text
//! - [`error`] -- Malformed payload errors

pub mod accumulator;
pub mod error;
pub mod extractor;
pub mod scanner;

pub use accumulator::StreamAccumulator;
pub use error::ProtocolError;
pub use extractor::{
    ExpectedPayload, Extraction, PayloadStatus, TagExtractor, parse_identification_json,
    try_extract,
};
pub use scanner::{RawTag, Scan, TagName, scan_from, strip_tags};
