use serde::{Deserialize, Serialize};

/// Why the server stopped generating the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    /// Generation was cut short by the length limit; the turn can be resumed
    /// with a `continue` request.
    MaxTokens,
}

impl FinishReason {
    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "stop" => Self::Stop,
            "max_tokens" => Self::MaxTokens,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::MaxTokens => "max_tokens",
        }
    }
}

/// One decoded assistant event.
///
/// `message` holds the full accumulated text of the turn so far, not just the
/// newest fragment; the final delta of a turn carries the authoritative ids
/// for threading the next request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDelta {
    pub message: String,
    pub conversation_id: String,
    /// Id of the assistant message itself; becomes the parent for the next turn.
    pub parent_id: String,
    pub model: Option<String>,
    /// `None` while the turn is still being generated.
    pub finish_reason: Option<FinishReason>,
    pub end_turn: bool,
    pub recipient: String,
}
