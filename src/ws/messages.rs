//! Client→server socket events.
//!
//! Every inbound frame is a JSON `{"event": <name>, "data": {…}}`
//! envelope deserialized into an explicit [`ClientEvent`] variant.
//! Required/optional fields are enforced here at the boundary; frames
//! that do not parse are rejected with a validation error event rather
//! than failing downstream.

use serde::Deserialize;

use crate::domain::{GroupId, MessageId, UserId};

/// Minimal shape of the message object a delete request carries.
///
/// Clients send the full record they hold; only the id and claimed
/// sender matter for authorization, extra fields are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageStub {
    /// Identifier of the message to delete.
    pub id: MessageId,
    /// The record's sender as the client knows it.
    pub from: UserId,
}

/// Events a client can emit over the socket channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Send a private message to a single user.
    #[serde(rename_all = "camelCase")]
    SendPrivateMessage {
        /// Sender identity.
        from: UserId,
        /// Recipient user identity.
        to: UserId,
        /// Text body, if any.
        #[serde(default)]
        content: Option<String>,
        /// Attached image URLs, if any.
        #[serde(default)]
        image_url: Option<Vec<String>>,
        /// Optional reply-to message id.
        #[serde(default)]
        reference: Option<MessageId>,
    },

    /// Send a message to a group broadcast channel.
    #[serde(rename_all = "camelCase")]
    SendGroupMessage {
        /// Sender identity.
        from: UserId,
        /// Target group identity.
        to: GroupId,
        /// Text body, if any.
        #[serde(default)]
        content: Option<String>,
        /// Attached image URLs, if any.
        #[serde(default)]
        image_url: Option<Vec<String>>,
        /// Optional reply-to message id.
        #[serde(default)]
        reference: Option<MessageId>,
    },

    /// Subscribe a user to a group's broadcast channel.
    #[serde(rename_all = "camelCase")]
    JoinGroup {
        /// Group to join.
        group_id: GroupId,
        /// Joining user identity.
        user_id: UserId,
    },

    /// Remove a user from a group's broadcast channel.
    #[serde(rename_all = "camelCase")]
    LeaveGroup {
        /// Group to leave.
        group_id: GroupId,
        /// Leaving user identity.
        user_id: UserId,
    },

    /// Fetch the message history of one conversation.
    #[serde(rename_all = "camelCase")]
    FetchMessages {
        /// Requesting user identity.
        user_id: UserId,
        /// Conversation partner: a user id, or a group id with `is_group`.
        chat_with_id: String,
        /// Whether `chat_with_id` names a group.
        is_group: bool,
    },

    /// Soft-delete a message.
    #[serde(rename_all = "camelCase")]
    DeleteMessage {
        /// The message to delete.
        message: MessageStub,
        /// Identity claiming the deletion.
        user_id: UserId,
    },

    /// Ephemeral typing indicator.
    #[serde(rename_all = "camelCase")]
    Typing {
        /// Recipient: a user id, or a group id with `is_group`.
        to: String,
        /// Whether the user is currently typing.
        typing: bool,
        /// Whether `to` names a group.
        #[serde(default)]
        is_group: bool,
        /// The typing user's identity.
        from: UserId,
    },
}
