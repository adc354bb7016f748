use serde::{Deserialize, Serialize};

use crate::conversation::fresh_message_id;

/// Request action understood by the conversation endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestAction {
    /// Append new messages to the thread.
    Next,
    /// Resume a turn the server truncated; carries no messages.
    Continue,
}

impl RequestAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Next => "next",
            Self::Continue => "continue",
        }
    }
}

/// Payload for `POST conversation`. Built fresh per call, never persisted.
///
/// `conversation_id` serializes as JSON `null` for a brand-new conversation;
/// the backend rejects requests that omit the key entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRequest {
    pub action: RequestAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<ChatMessage>>,
    pub conversation_id: Option<String>,
    pub parent_message_id: String,
    pub model: String,
}

impl ConversationRequest {
    pub fn next(
        messages: Vec<ChatMessage>,
        conversation_id: Option<String>,
        parent_message_id: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            action: RequestAction::Next,
            messages: Some(messages),
            conversation_id,
            parent_message_id: parent_message_id.into(),
            model: model.into(),
        }
    }

    pub fn continuation(
        conversation_id: Option<String>,
        parent_message_id: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            action: RequestAction::Continue,
            messages: None,
            conversation_id,
            parent_message_id: parent_message_id.into(),
            model: model.into(),
        }
    }
}

/// Client-authored message in the backend's wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub author: MessageAuthor,
    pub content: MessageContent,
}

impl ChatMessage {
    /// A plain-text user message with a fresh client-assigned id.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: fresh_message_id(),
            author: MessageAuthor {
                role: "user".to_owned(),
            },
            content: MessageContent {
                content_type: "text".to_owned(),
                parts: vec![text.into()],
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAuthor {
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent {
    pub content_type: String,
    pub parts: Vec<String>,
}
