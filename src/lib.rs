//! Streaming client for the ChatGPT web backend API.
//!
//! This crate owns conversation threading, request building, and
//! server-sent-event decoding for the backend's private conversation
//! endpoints. It intentionally contains no login code: authentication is an
//! already-obtained bearer token, supplied by an external credential
//! provider.
//!
//! The backend contract is unversioned and drifts; recoverable stream noise
//! is skipped silently, while a missing required field surfaces as
//! [`ChatGptError::MalformedEvent`] so callers notice breaking changes
//! instead of silently losing output.

pub mod chatbot;
pub mod config;
pub mod conversation;
pub mod error;
pub mod events;
pub mod headers;
pub mod payload;
pub mod sse;
pub mod transport;
pub mod url;

pub use chatbot::{ChatBot, TurnOptions};
pub use config::ChatGptConfig;
pub use conversation::{ConversationMapping, ConversationState};
pub use error::ChatGptError;
pub use events::{FinishReason, MessageDelta};
pub use payload::{ChatMessage, ConversationRequest, RequestAction};
pub use sse::{decode_line, decode_lines, LineOutcome};
pub use transport::Transport;
