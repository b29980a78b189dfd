//! Message records, enrichment views, and directory profiles.
//!
//! A [`MessageRecord`] is the durable unit owned by the message store:
//! append-mostly, immutable except for the one-way soft-delete status
//! transition. [`EnrichedMessage`] is the view delivered over the socket
//! channel and from history queries, carrying the sender's profile and
//! the resolved reply-to reference.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MessageId, UserId};

/// Lifecycle status of a message record.
///
/// The only permitted transition is `Active` → `Deleted` (soft delete,
/// one-way, no resurrection). Deleted records stay in the store and are
/// not filtered from history queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageStatus {
    /// Message is visible.
    #[serde(rename = "ACTIVE")]
    Active,
    /// Message was soft-deleted by its sender.
    #[serde(rename = "DELETED")]
    Deleted,
}

impl MessageStatus {
    /// Returns the wire string for this status (`"ACTIVE"` / `"DELETED"`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Deleted => "DELETED",
        }
    }
}

/// Discriminator for what kind of identity the `to` field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecipientKind {
    /// `to` is a user identity (private message).
    User,
    /// `to` is a group identity (group broadcast).
    Group,
}

impl RecipientKind {
    /// Returns the wire string for this kind (`"User"` / `"Group"`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Group => "Group",
        }
    }
}

/// Input for creating a message record.
///
/// The store assigns the id, status, and timestamps.
#[derive(Debug, Clone)]
pub struct NewMessage {
    /// Sender identity.
    pub from: UserId,
    /// Recipient identity: a user id or a group id depending on `to_ref`.
    pub to: String,
    /// What kind of identity `to` names.
    pub to_ref: RecipientKind,
    /// Whether this is a group broadcast message.
    pub is_group: bool,
    /// Text body, if any.
    pub content: Option<String>,
    /// Attached image URLs, if any.
    pub image_url: Option<Vec<String>>,
    /// Optional reply-to back-link to a prior message.
    pub reference: Option<MessageId>,
}

impl NewMessage {
    /// Builds the input for a private message addressed to a user.
    #[must_use]
    pub fn private(
        from: UserId,
        to: &UserId,
        content: Option<String>,
        image_url: Option<Vec<String>>,
        reference: Option<MessageId>,
    ) -> Self {
        Self {
            from,
            to: to.as_str().to_string(),
            to_ref: RecipientKind::User,
            is_group: false,
            content,
            image_url,
            reference,
        }
    }

    /// Builds the input for a group broadcast message.
    #[must_use]
    pub fn group(
        from: UserId,
        group_id: &super::GroupId,
        content: Option<String>,
        image_url: Option<Vec<String>>,
        reference: Option<MessageId>,
    ) -> Self {
        Self {
            from,
            to: group_id.as_str().to_string(),
            to_ref: RecipientKind::Group,
            is_group: true,
            content,
            image_url,
            reference,
        }
    }
}

/// A persisted message record.
///
/// Owned by the message store. Immutable except for `status` and the
/// accompanying `updated_at`; never hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    /// Store-assigned message identifier.
    pub id: MessageId,
    /// Sender identity.
    pub from: UserId,
    /// Recipient identity: user id or group id depending on `to_ref`.
    pub to: String,
    /// What kind of identity `to` names.
    pub to_ref: RecipientKind,
    /// Whether this is a group broadcast message.
    pub is_group: bool,
    /// Text body, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Attached image URLs, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<Vec<String>>,
    /// Optional reply-to back-link, resolved by lookup, never embedded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<MessageId>,
    /// Soft-delete status.
    pub status: MessageStatus,
    /// Creation timestamp (store-assigned).
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last status transition.
    pub updated_at: DateTime<Utc>,
}

impl MessageRecord {
    /// Materializes a record from its creation input.
    ///
    /// Assigns a fresh id, `Active` status, and matching timestamps.
    #[must_use]
    pub fn from_new(new_message: NewMessage) -> Self {
        let now = Utc::now();
        Self {
            id: MessageId::new(),
            from: new_message.from,
            to: new_message.to,
            to_ref: new_message.to_ref,
            is_group: new_message.is_group,
            content: new_message.content,
            image_url: new_message.image_url,
            reference: new_message.reference,
            status: MessageStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Read-only user profile data from the external user collaborator.
///
/// Used solely to enrich outgoing messages and history entries; the core
/// never writes profiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// User identity.
    pub id: UserId,
    /// Display name, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    /// Avatar URL, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// A durable group record from the external group collaborator.
///
/// Consulted only by the REST conversation overview, never by live
/// fan-out decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRecord {
    /// Group identity.
    pub id: super::GroupId,
    /// Group display name.
    pub name: String,
    /// Group avatar URL, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Durable member roster (user identities).
    pub member_ids: Vec<UserId>,
}

/// A message record enriched with its sender's profile and, when the
/// record carries a reply-to reference, the referenced record with its
/// own sender profile.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedMessage {
    /// The underlying record, flattened into the payload.
    #[serde(flatten)]
    pub message: MessageRecord,
    /// Sender profile, when the directory knows the sender.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<UserProfile>,
    /// Resolved reply-to message, when `reference` is set and found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referenced: Option<Box<ReferencedMessage>>,
}

/// The resolved target of a reply-to reference.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferencedMessage {
    /// The referenced record, flattened into the payload.
    #[serde(flatten)]
    pub message: MessageRecord,
    /// The referenced record's sender profile, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<UserProfile>,
}
