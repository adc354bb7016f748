use std::time::Duration;

use async_stream::try_stream;
use futures_util::{pin_mut, Stream, StreamExt};
use serde_json::{json, Value};

use crate::config::ChatGptConfig;
use crate::conversation::{fresh_message_id, ConversationMapping, ConversationState};
use crate::error::ChatGptError;
use crate::events::{FinishReason, MessageDelta};
use crate::payload::{ChatMessage, ConversationRequest, RequestAction};
use crate::sse::decode_lines;
use crate::transport::Transport;
use crate::url;

/// Model the backend expects on title-generation requests.
const TITLE_MODEL: &str = "text-davinci-002-render";

/// Per-call options for [`ChatBot::ask`], [`ChatBot::post_messages`], and
/// [`ChatBot::continue_write`].
#[derive(Debug, Clone, Default)]
pub struct TurnOptions {
    /// Conversation to continue; defaults to the session's current one.
    pub conversation_id: Option<String>,
    /// Message to thread after; requires `conversation_id`.
    pub parent_id: Option<String>,
    /// Model override for this call only.
    pub model: Option<String>,
    /// Keep requesting continuations while the server truncates at the
    /// length limit, splicing the turns into one seamless transcript.
    pub auto_continue: bool,
    /// Deadline override for this call only.
    pub timeout: Option<Duration>,
}

impl TurnOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    #[must_use]
    pub fn with_parent_id(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn with_auto_continue(mut self, auto_continue: bool) -> Self {
        self.auto_continue = auto_continue;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// One logical chat session against the ChatGPT web backend.
///
/// Tracks the conversation/parent ids across turns, drives the streaming
/// decode loop, and transparently continues turns the server truncated.
/// Turn methods borrow the session mutably for the lifetime of the returned
/// stream, so a session can have at most one request in flight; run separate
/// `ChatBot` instances for parallel conversations.
pub struct ChatBot {
    config: ChatGptConfig,
    transport: Transport,
    state: ConversationState,
    mapping: ConversationMapping,
}

impl ChatBot {
    pub fn new(config: ChatGptConfig) -> Result<Self, ChatGptError> {
        let transport = Transport::new(&config)?;
        Ok(Self {
            config,
            transport,
            state: ConversationState::default(),
            mapping: ConversationMapping::default(),
        })
    }

    pub fn config(&self) -> &ChatGptConfig {
        &self.config
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.state.conversation_id()
    }

    pub fn parent_message_id(&self) -> Option<&str> {
        self.state.parent_message_id()
    }

    /// Point the session at another conversation. The cached parent id is
    /// discarded and re-resolved on the next call.
    pub fn set_conversation_id(&mut self, conversation_id: impl Into<String>) {
        self.state.set_conversation_id(conversation_id);
        self.state.clear_parent();
    }

    pub fn mapping(&self) -> &ConversationMapping {
        &self.mapping
    }

    /// Pre-seed the lookup cache, e.g. from persisted session data.
    pub fn mapping_mut(&mut self) -> &mut ConversationMapping {
        &mut self.mapping
    }

    /// Send a single user message and stream the assistant's reply.
    pub fn ask<'a>(
        &'a mut self,
        prompt: &str,
        opts: TurnOptions,
    ) -> impl Stream<Item = Result<MessageDelta, ChatGptError>> + 'a {
        let messages = vec![ChatMessage::user(prompt)];
        self.post_messages(messages, opts)
    }

    /// Send a prepared message list and stream the assistant's reply.
    pub fn post_messages(
        &mut self,
        messages: Vec<ChatMessage>,
        opts: TurnOptions,
    ) -> impl Stream<Item = Result<MessageDelta, ChatGptError>> + '_ {
        self.run_turn(RequestAction::Next, Some(messages), opts)
    }

    /// Ask the server to resume a previously truncated turn.
    pub fn continue_write(
        &mut self,
        opts: TurnOptions,
    ) -> impl Stream<Item = Result<MessageDelta, ChatGptError>> + '_ {
        self.run_turn(RequestAction::Continue, None, opts)
    }

    fn run_turn(
        &mut self,
        action: RequestAction,
        messages: Option<Vec<ChatMessage>>,
        opts: TurnOptions,
    ) -> impl Stream<Item = Result<MessageDelta, ChatGptError>> + '_ {
        try_stream! {
            if opts.parent_id.is_some() && opts.conversation_id.is_none() {
                Err::<(), _>(ChatGptError::usage(
                    "conversation_id must be set once parent_id is set",
                ))?;
            }

            let mut action = action;
            let mut messages = messages;
            let mut supplied_cid = opts.conversation_id.clone();
            let mut supplied_pid = opts.parent_id.clone();
            let mut model_override = opts.model.clone();
            let mut prefix = String::new();

            loop {
                let (cid, pid) = self
                    .resolve_ids(supplied_cid.take(), supplied_pid.take())
                    .await?;
                let model = self.config.resolved_model(model_override.as_deref());
                let payload = match action {
                    RequestAction::Next => ConversationRequest::next(
                        messages.take().unwrap_or_default(),
                        cid.clone(),
                        pid.clone(),
                        model,
                    ),
                    RequestAction::Continue => {
                        ConversationRequest::continuation(cid.clone(), pid.clone(), model)
                    }
                };

                // Rollback point survives even if the request fails below.
                self.state.push(cid.clone(), pid.clone());

                let lines = self
                    .transport
                    .post_stream(url::CONVERSATION, &payload, opts.timeout)
                    .await?;
                let deltas = decode_lines(lines);
                pin_mut!(deltas);

                let mut last: Option<MessageDelta> = None;
                while let Some(delta) = deltas.next().await {
                    let mut delta = delta?;
                    if !prefix.is_empty() {
                        delta.message = format!("{prefix}{}", delta.message);
                    }
                    self.state.observe(&delta.conversation_id, &delta.parent_id);
                    last = Some(delta.clone());
                    yield delta;
                }

                let Some(last) = last else {
                    // Stream ended before any assistant event; fall back to
                    // the ids we sent so the session stays addressable.
                    if let Some(conversation_id) = cid {
                        self.mapping.record(conversation_id.clone(), pid.clone());
                        self.state.set_conversation_id(conversation_id);
                    }
                    self.state.set_parent_message_id(pid);
                    break;
                };

                self.mapping
                    .record(last.conversation_id.clone(), last.parent_id.clone());

                if !(opts.auto_continue && last.finish_reason == Some(FinishReason::MaxTokens)) {
                    break;
                }

                log::debug!(
                    "turn in conversation {} truncated at max_tokens, continuing",
                    last.conversation_id
                );
                prefix = last.message.trim_end_matches('\n').to_owned();
                action = RequestAction::Continue;
                messages = None;
                supplied_cid = Some(last.conversation_id.clone());
                if model_override.is_none() {
                    model_override = last.model.clone();
                }
            }
        }
    }

    /// Resolve the effective (conversation id, parent id) pair for a request.
    ///
    /// Precedence: supplied values, then session state, then the lookup
    /// cache, then a best-effort history fetch; if nothing resolves, the call
    /// starts a brand-new conversation with a locally generated parent id.
    async fn resolve_ids(
        &mut self,
        supplied_cid: Option<String>,
        supplied_pid: Option<String>,
    ) -> Result<(Option<String>, String), ChatGptError> {
        if let Some(cid) = supplied_cid.as_deref() {
            if self.state.conversation_id() != Some(cid) {
                self.state.clear_parent();
            }
        }

        let conversation_id =
            supplied_cid.or_else(|| self.state.conversation_id().map(str::to_owned));
        let parent_id = supplied_pid
            .or_else(|| self.state.parent_message_id().map(str::to_owned))
            .unwrap_or_default();

        let Some(conversation_id) = conversation_id else {
            if parent_id.is_empty() {
                // Brand-new conversation, no history needed.
                return Ok((None, fresh_message_id()));
            }
            return Ok((None, parent_id));
        };

        if !parent_id.is_empty() {
            return Ok((Some(conversation_id), parent_id));
        }

        if self.mapping.resolve(&conversation_id).is_none() {
            if self.config.lazy_loading {
                log::debug!(
                    "conversation {conversation_id} not in mapping, fetching its history"
                );
                match self.get_msg_history(&conversation_id).await {
                    Ok(history) => {
                        if let Some(node) = history.get("current_node").and_then(Value::as_str) {
                            self.mapping.record(conversation_id.clone(), node.to_owned());
                        }
                    }
                    Err(error) => {
                        log::debug!("history fetch for {conversation_id} failed: {error}");
                    }
                }
            } else {
                log::debug!(
                    "conversation {conversation_id} not in mapping, rebuilding all mappings"
                );
                if let Err(error) = self.map_conversations().await {
                    log::debug!("bulk conversation mapping failed: {error}");
                }
            }
        }

        match self.mapping.resolve(&conversation_id) {
            Some(parent_id) => Ok((Some(conversation_id), parent_id.to_owned())),
            // Unknown conversation id: treat as brand new.
            None => Ok((None, fresh_message_id())),
        }
    }

    /// List conversations, newest first.
    pub async fn get_conversations(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Value>, ChatGptError> {
        let body = self
            .transport
            .get_json(&url::conversations_page(offset, limit))
            .await?;
        match body.get("items").and_then(Value::as_array) {
            Some(items) => Ok(items.clone()),
            None => Err(ChatGptError::MalformedEvent(body)),
        }
    }

    /// Fetch the full message history of one conversation.
    pub async fn get_msg_history(&self, conversation_id: &str) -> Result<Value, ChatGptError> {
        self.transport
            .get_json(&url::conversation_by_id(conversation_id))
            .await
    }

    /// Ask the server to generate a title for a conversation.
    pub async fn gen_title(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<String, ChatGptError> {
        let body = self
            .transport
            .post_json(
                &url::gen_title(conversation_id),
                json!({"message_id": message_id, "model": TITLE_MODEL}),
            )
            .await?;
        match body.get("title").and_then(Value::as_str) {
            Some(title) => Ok(title.to_owned()),
            None => Err(ChatGptError::MalformedEvent(body)),
        }
    }

    /// Rename a conversation.
    pub async fn change_title(
        &self,
        conversation_id: &str,
        title: &str,
    ) -> Result<(), ChatGptError> {
        self.transport
            .patch_json(
                &url::conversation_by_id(conversation_id),
                json!({"title": title}),
            )
            .await?;
        Ok(())
    }

    /// Soft-delete one conversation.
    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<(), ChatGptError> {
        self.transport
            .patch_json(
                &url::conversation_by_id(conversation_id),
                json!({"is_visible": false}),
            )
            .await?;
        Ok(())
    }

    /// Soft-delete every conversation on the account.
    pub async fn clear_conversations(&self) -> Result<(), ChatGptError> {
        self.transport
            .patch_json(url::CONVERSATIONS, json!({"is_visible": false}))
            .await?;
        Ok(())
    }

    /// Rebuild the lookup cache from a full conversation listing.
    ///
    /// The listing and the fetched histories are zipped strictly by
    /// position; there is no other correlation key between the two.
    pub async fn map_conversations(&mut self) -> Result<(), ChatGptError> {
        let conversations = self.get_conversations(0, 20).await?;
        let mut histories = Vec::with_capacity(conversations.len());
        for conversation in &conversations {
            let Some(id) = conversation.get("id").and_then(Value::as_str) else {
                return Err(ChatGptError::MalformedEvent(conversation.clone()));
            };
            histories.push(self.get_msg_history(id).await?);
        }

        for (conversation, history) in conversations.iter().zip(&histories) {
            let id = conversation.get("id").and_then(Value::as_str);
            let node = history.get("current_node").and_then(Value::as_str);
            if let (Some(id), Some(node)) = (id, node) {
                self.mapping.record(id, node);
            }
        }

        Ok(())
    }

    /// Forget the current conversation and start a fresh one.
    pub fn reset_chat(&mut self) {
        self.state.reset();
    }

    /// Restore the (conversation id, parent id) pair from `steps` turns ago.
    pub fn rollback_conversation(&mut self, steps: usize) -> Result<(), ChatGptError> {
        self.state.rollback(steps)
    }
}
