use async_stream::try_stream;
use futures_util::{pin_mut, Stream, StreamExt};
use serde_json::Value;

use crate::error::ChatGptError;
use crate::events::{FinishReason, MessageDelta};

/// Outcome of decoding a single stream line.
///
/// Recoverable noise (blank lines, partial JSON fragments, user-echo events)
/// maps to `Skip`; a genuinely broken event shape is an error instead, since
/// it signals the backend contract drifted.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Delta(MessageDelta),
    Skip,
    /// The `[DONE]` sentinel: end of stream, no error.
    Done,
}

/// Decode one raw line from the conversation event stream.
pub fn decode_line(line: &str) -> Result<LineOutcome, ChatGptError> {
    if line.is_empty() {
        return Ok(LineOutcome::Skip);
    }
    if line.eq_ignore_ascii_case("internal server error") {
        return Err(ChatGptError::Server(line.to_owned()));
    }

    let payload = line.strip_prefix("data: ").unwrap_or(line);
    if payload == "[DONE]" {
        return Ok(LineOutcome::Done);
    }

    let Ok(value) = serde_json::from_str::<Value>(payload) else {
        // Partial fragments are expected mid-stream.
        return Ok(LineOutcome::Skip);
    };

    delta_from_event(value)
}

fn delta_from_event(value: Value) -> Result<LineOutcome, ChatGptError> {
    if value.pointer("/message/content").is_none() {
        return Err(ChatGptError::MalformedEvent(value));
    }

    let role = value
        .pointer("/message/author/role")
        .and_then(Value::as_str);
    if role != Some("assistant") {
        // Some event types echo the caller's own message back.
        return Ok(LineOutcome::Skip);
    }

    let message = value
        .pointer("/message/content/parts/0")
        .and_then(Value::as_str);
    let conversation_id = value.get("conversation_id").and_then(Value::as_str);
    let parent_id = value.pointer("/message/id").and_then(Value::as_str);
    let (Some(message), Some(conversation_id), Some(parent_id)) =
        (message, conversation_id, parent_id)
    else {
        return Err(ChatGptError::MalformedEvent(value));
    };

    let model = value
        .pointer("/message/metadata/model_slug")
        .and_then(Value::as_str)
        .map(str::to_owned);
    let finish_reason = value
        .pointer("/message/metadata/finish_details/type")
        .and_then(Value::as_str)
        .and_then(FinishReason::parse);
    let end_turn = value
        .pointer("/message/end_turn")
        .and_then(Value::as_bool)
        .unwrap_or(true);
    let recipient = value
        .pointer("/message/recipient")
        .and_then(Value::as_str)
        .unwrap_or("all")
        .to_owned();

    Ok(LineOutcome::Delta(MessageDelta {
        message: message.to_owned(),
        conversation_id: conversation_id.to_owned(),
        parent_id: parent_id.to_owned(),
        model,
        finish_reason,
        end_turn,
        recipient,
    }))
}

/// Drive [`decode_line`] over a lazy line sequence.
///
/// Deltas come out strictly in wire order; nothing is emitted after the
/// `[DONE]` sentinel; the sequence is finite and not restartable. Dropping
/// the returned stream drops the underlying line source with it.
pub fn decode_lines<S>(lines: S) -> impl Stream<Item = Result<MessageDelta, ChatGptError>>
where
    S: Stream<Item = Result<String, ChatGptError>>,
{
    try_stream! {
        pin_mut!(lines);
        while let Some(line) = lines.next().await {
            match decode_line(&line?)? {
                LineOutcome::Delta(delta) => yield delta,
                LineOutcome::Skip => continue,
                LineOutcome::Done => break,
            }
        }
    }
}
