use std::collections::HashMap;

use uuid::Uuid;

use crate::error::ChatGptError;

/// Generate a fresh client-side message id.
pub fn fresh_message_id() -> String {
    Uuid::new_v4().to_string()
}

/// Threading position of one chat session.
///
/// Owned exclusively by the [`ChatBot`](crate::ChatBot) that mutates it; a
/// session supports at most one in-flight request, which the orchestrator
/// enforces by holding `&mut self` across each streamed turn.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    conversation_id: Option<String>,
    parent_message_id: Option<String>,
    history: Vec<(Option<String>, String)>,
}

impl ConversationState {
    pub fn new(conversation_id: Option<String>, parent_message_id: Option<String>) -> Self {
        Self {
            conversation_id,
            parent_message_id,
            history: Vec::new(),
        }
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn parent_message_id(&self) -> Option<&str> {
        self.parent_message_id.as_deref()
    }

    pub fn set_conversation_id(&mut self, conversation_id: impl Into<String>) {
        self.conversation_id = Some(conversation_id.into());
    }

    pub fn set_parent_message_id(&mut self, parent_message_id: impl Into<String>) {
        self.parent_message_id = Some(parent_message_id.into());
    }

    /// Forget the cached parent. Switching conversations invalidates it.
    pub fn clear_parent(&mut self) {
        self.parent_message_id = None;
    }

    /// Record the ids a delta reported, so a mid-stream failure leaves the
    /// session at the last successfully observed position.
    pub fn observe(&mut self, conversation_id: &str, parent_message_id: &str) {
        self.conversation_id = Some(conversation_id.to_owned());
        self.parent_message_id = Some(parent_message_id.to_owned());
    }

    /// Push the pair about to be sent onto the rollback stack.
    ///
    /// Pushed before the request goes out, so a turn that fails downstream
    /// still leaves a rollback point (at-least-once push).
    pub fn push(&mut self, conversation_id: Option<String>, parent_message_id: String) {
        self.history.push((conversation_id, parent_message_id));
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Pop `steps` entries, restoring the pair in effect before them.
    ///
    /// Underflow is a hard error; nothing is popped unless the full rollback
    /// is possible.
    pub fn rollback(&mut self, steps: usize) -> Result<(), ChatGptError> {
        let available = self.history.len();
        if steps == 0 {
            return Ok(());
        }
        if steps > available {
            return Err(ChatGptError::Rollback {
                requested: steps,
                available,
            });
        }

        let (conversation_id, parent_message_id) = self.history[available - steps].clone();
        self.history.truncate(available - steps);
        self.conversation_id = conversation_id;
        self.parent_message_id = Some(parent_message_id);
        Ok(())
    }

    /// Start a brand-new conversation: no server id yet, a fresh local parent,
    /// and an empty rollback stack.
    pub fn reset(&mut self) {
        self.conversation_id = None;
        self.parent_message_id = Some(fresh_message_id());
        self.history.clear();
    }
}

/// Fallback lookup from conversation id to its last-known parent message id.
///
/// Populated lazily from single history fetches or eagerly from a bulk
/// rebuild. Never authoritative over [`ConversationState`] for the current
/// conversation.
#[derive(Debug, Clone, Default)]
pub struct ConversationMapping {
    entries: HashMap<String, String>,
}

impl ConversationMapping {
    pub fn resolve(&self, conversation_id: &str) -> Option<&str> {
        self.entries.get(conversation_id).map(String::as_str)
    }

    pub fn record(
        &mut self,
        conversation_id: impl Into<String>,
        parent_message_id: impl Into<String>,
    ) {
        self.entries
            .insert(conversation_id.into(), parent_message_id.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
