//! Server→client events pushed over the socket channel.
//!
//! Every routed message, deletion, history reply, typing signal, and
//! per-event error is delivered as a [`ChatEvent`]. Events are serialized
//! as `{"event": <name>, "data": {…}}` envelopes.

use serde::Serialize;

use super::message::EnrichedMessage;
use super::{MessageId, UserId};
use crate::error::RelayError;

/// An event pushed to one live connection.
///
/// Dispatch is fire-and-forget: no acknowledgement, no retry, no delivery
/// guarantee beyond one attempt against the handle's queue.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A newly created private message, delivered to recipient and sender.
    PrivateMessage(EnrichedMessage),

    /// A newly created group message, delivered to live group members.
    GroupMessage(EnrichedMessage),

    /// Reply to a history fetch, delivered to the requesting connection
    /// only, ordered by creation time ascending.
    MessageHistory(Vec<EnrichedMessage>),

    /// A message was soft-deleted.
    MessageDeleted {
        /// Identifier of the deleted message.
        #[serde(rename = "messageId")]
        message_id: MessageId,
    },

    /// Ephemeral typing indicator. Never persisted.
    UserTyping {
        /// Identity of the user who is (or stopped) typing.
        from: UserId,
        /// Whether the user is currently typing.
        typing: bool,
    },

    /// A handler error reported back to the originating connection.
    Error {
        /// Numeric error code (see [`RelayError::error_code`]).
        code: u32,
        /// Human-readable error message.
        message: String,
    },
}

impl ChatEvent {
    /// Returns the event name as a static string slice.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::PrivateMessage(_) => "private_message",
            Self::GroupMessage(_) => "group_message",
            Self::MessageHistory(_) => "message_history",
            Self::MessageDeleted { .. } => "message_deleted",
            Self::UserTyping { .. } => "user_typing",
            Self::Error { .. } => "error",
        }
    }
}

impl From<&RelayError> for ChatEvent {
    fn from(err: &RelayError) -> Self {
        Self::Error {
            code: err.error_code(),
            message: err.to_string(),
        }
    }
}
