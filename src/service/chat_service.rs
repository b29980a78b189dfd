//! Chat service: orchestrates persistence, enrichment, and delivery.
//!
//! Every socket event lands here after boundary validation. Mutation
//! methods follow the pattern: persist via the message store → enrich via
//! the directory → resolve live recipients → dispatch through the fan-out
//! engine. Recipient resolution always happens after the persistence
//! await, against current registry and membership state.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{
    ChatEvent, ConnectionRegistry, EnrichedMessage, GroupId, GroupMembership, MessageId,
    MessageRecord, MessageStatus, NewMessage, RecipientKind, ReferencedMessage, UserId,
    UserProfile,
};
use crate::error::RelayError;
use crate::persistence::{Directory, MessageStore};
use crate::service::FanoutEngine;

/// One entry of the REST conversation overview.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationEntry {
    /// Display name of the sender (raw identity when no profile exists).
    pub from: String,
    /// Text body of the message, if any.
    pub message: Option<String>,
    /// Creation timestamp; absent for group placeholder entries.
    pub created_at: Option<DateTime<Utc>>,
    /// Whether the conversation is a group channel.
    pub is_group: bool,
    /// Identity of the conversation partner or group.
    pub chat_id: String,
    /// Avatar of the conversation partner or group, if any.
    pub avatar: Option<String>,
}

/// Orchestration layer for all chat operations.
///
/// Stateless coordinator: owns references to the message store and
/// directory for durable data, and to the connection registry and live
/// membership table for delivery decisions.
#[derive(Debug, Clone)]
pub struct ChatService {
    store: Arc<dyn MessageStore>,
    directory: Arc<dyn Directory>,
    registry: Arc<ConnectionRegistry>,
    membership: Arc<GroupMembership>,
    fanout: FanoutEngine,
}

impl ChatService {
    /// Creates a new `ChatService`.
    #[must_use]
    pub fn new(
        store: Arc<dyn MessageStore>,
        directory: Arc<dyn Directory>,
        registry: Arc<ConnectionRegistry>,
        membership: Arc<GroupMembership>,
    ) -> Self {
        let fanout = FanoutEngine::new(Arc::clone(&registry));
        Self {
            store,
            directory,
            registry,
            membership,
            fanout,
        }
    }

    /// Returns a reference to the connection registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Returns a reference to the live membership table.
    #[must_use]
    pub fn membership(&self) -> &Arc<GroupMembership> {
        &self.membership
    }

    /// Persists and routes a private message.
    ///
    /// Targets are the recipient and the sender (so the sender's own
    /// session observes the echo), resolved at dispatch time. An offline
    /// recipient still yields a persisted record delivered to the sender
    /// only.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] when the record cannot be
    /// created; no delivery is attempted in that case.
    pub async fn send_private_message(
        &self,
        from: UserId,
        to: UserId,
        content: Option<String>,
        image_url: Option<Vec<String>>,
        reference: Option<MessageId>,
    ) -> Result<EnrichedMessage, RelayError> {
        let record = self
            .store
            .create(NewMessage::private(
                from.clone(),
                &to,
                content,
                image_url,
                reference,
            ))
            .await?;
        let enriched = self.enrich(record, true).await?;

        let targets = [to, from];
        let delivered = self
            .fanout
            .dispatch(targets.iter(), &ChatEvent::PrivateMessage(enriched.clone()))
            .await;
        tracing::debug!(message = %enriched.message.id, delivered, "private message routed");

        Ok(enriched)
    }

    /// Persists and routes a group message.
    ///
    /// Targets are the group's current live members; the sender receives
    /// a copy only if it joined the group channel itself. Membership is
    /// read after the persistence await, never cached across it.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] when the record cannot be
    /// created; no delivery is attempted in that case.
    pub async fn send_group_message(
        &self,
        from: UserId,
        group_id: GroupId,
        content: Option<String>,
        image_url: Option<Vec<String>>,
        reference: Option<MessageId>,
    ) -> Result<EnrichedMessage, RelayError> {
        let record = self
            .store
            .create(NewMessage::group(from, &group_id, content, image_url, reference))
            .await?;
        let enriched = self.enrich(record, true).await?;

        let members = self.membership.members(&group_id).await;
        let delivered = self
            .fanout
            .dispatch(members.iter(), &ChatEvent::GroupMessage(enriched.clone()))
            .await;
        tracing::debug!(
            message = %enriched.message.id,
            group = %group_id,
            delivered,
            "group message routed"
        );

        Ok(enriched)
    }

    /// Subscribes a user to a group's broadcast channel.
    pub async fn join_group(&self, group_id: GroupId, user_id: UserId) {
        self.membership.join(group_id, user_id).await;
    }

    /// Removes a user from a group's broadcast channel.
    pub async fn leave_group(&self, group_id: GroupId, user_id: UserId) {
        self.membership.leave(&group_id, &user_id).await;
    }

    /// Returns the message history for one conversation, oldest first.
    ///
    /// Group history is every record addressed to the group; private
    /// history is every record between the two identities in either
    /// direction. Soft-deleted records are included; consumers filter by
    /// `status` if they want them hidden.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on storage failure.
    pub async fn fetch_messages(
        &self,
        user_id: &UserId,
        chat_with_id: &str,
        is_group: bool,
    ) -> Result<Vec<EnrichedMessage>, RelayError> {
        let records = if is_group {
            self.store.find_for_group(&GroupId::new(chat_with_id)).await?
        } else {
            self.store
                .find_conversation(user_id, &UserId::new(chat_with_id), false)
                .await?
        };

        let mut history = Vec::with_capacity(records.len());
        for record in records {
            history.push(self.enrich(record, false).await?);
        }
        Ok(history)
    }

    /// Soft-deletes a message and notifies affected live connections.
    ///
    /// Only the sender may delete its own message. Deleting an already
    /// deleted record succeeds and leaves it `DELETED`. Private deletions
    /// notify the record's recipient and sender; group deletions notify
    /// the group's current live members.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Unauthorized`] when `user_id` is not the
    /// claimed sender, [`RelayError::MessageNotFound`] when no record with
    /// the given id exists, or [`RelayError::Persistence`] on storage
    /// failure.
    pub async fn delete_message(
        &self,
        message_id: MessageId,
        message_from: UserId,
        user_id: UserId,
    ) -> Result<MessageRecord, RelayError> {
        if message_from != user_id {
            return Err(RelayError::Unauthorized(
                "cannot delete this message".to_string(),
            ));
        }

        let deleted = self
            .store
            .update_status(message_id, MessageStatus::Deleted)
            .await?
            .ok_or(RelayError::MessageNotFound(message_id))?;

        let event = ChatEvent::MessageDeleted {
            message_id: deleted.id,
        };
        let delivered = if deleted.is_group {
            let members = self.membership.members(&GroupId::new(&deleted.to)).await;
            self.fanout.dispatch(members.iter(), &event).await
        } else {
            let targets = [UserId::new(&deleted.to), deleted.from.clone()];
            self.fanout.dispatch(targets.iter(), &event).await
        };
        tracing::info!(message = %deleted.id, delivered, "message soft-deleted");

        Ok(deleted)
    }

    /// Routes an ephemeral typing indicator. Never persisted.
    ///
    /// Group indicators reach every live member except the typist;
    /// private indicators reach the single recipient. Silently no-ops
    /// when no target resolves.
    pub async fn typing(&self, from: UserId, to: &str, typing: bool, is_group: bool) {
        let event = ChatEvent::UserTyping {
            from: from.clone(),
            typing,
        };
        if is_group {
            let members = self.membership.members(&GroupId::new(to)).await;
            let targets: Vec<&UserId> = members.iter().filter(|m| **m != from).collect();
            self.fanout.dispatch(targets.into_iter(), &event).await;
        } else {
            let targets = [UserId::new(to)];
            self.fanout.dispatch(targets.iter(), &event).await;
        }
    }

    /// Builds the REST conversation overview for a user: every `ACTIVE`
    /// message involving the user, grouped per conversation partner or
    /// group, newest first, plus placeholder entries for durable groups
    /// with no messages yet.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::UserNotFound`] when the directory does not
    /// know the user, or [`RelayError::Persistence`] on storage failure.
    pub async fn conversation_overview(
        &self,
        user_id: &UserId,
    ) -> Result<HashMap<String, Vec<ConversationEntry>>, RelayError> {
        if self.directory.user(user_id).await?.is_none() {
            return Err(RelayError::UserNotFound(user_id.to_string()));
        }

        let groups = self.directory.groups_of(user_id).await?;
        let group_ids: Vec<GroupId> = groups.iter().map(|g| g.id.clone()).collect();
        let records = self.store.find_involving(user_id, &group_ids).await?;

        let mut chats: HashMap<String, Vec<ConversationEntry>> = HashMap::new();
        let mut profiles: HashMap<UserId, Option<UserProfile>> = HashMap::new();

        for record in records {
            let (key, chat_id, avatar) = if record.to_ref == RecipientKind::Group {
                match groups.iter().find(|g| record.to == g.id.as_str()) {
                    Some(group) => (group.name.clone(), group.id.to_string(), group.avatar.clone()),
                    None => (record.to.clone(), record.to.clone(), None),
                }
            } else {
                let counterpart = if record.to == user_id.as_str() {
                    record.from.clone()
                } else {
                    UserId::new(&record.to)
                };
                let profile = self.cached_profile(&mut profiles, &counterpart).await?;
                let name = profile
                    .as_ref()
                    .and_then(|p| p.user_name.clone())
                    .unwrap_or_else(|| counterpart.to_string());
                let avatar = profile.as_ref().and_then(|p| p.avatar.clone());
                (name, counterpart.to_string(), avatar)
            };

            let sender = self.cached_profile(&mut profiles, &record.from).await?;
            let from = sender
                .as_ref()
                .and_then(|p| p.user_name.clone())
                .unwrap_or_else(|| record.from.to_string());

            chats.entry(key).or_default().push(ConversationEntry {
                from,
                message: record.content,
                created_at: Some(record.created_at),
                is_group: record.is_group,
                chat_id,
                avatar,
            });
        }

        // Durable groups without any message yet still show up.
        for group in groups {
            chats.entry(group.name.clone()).or_insert_with(|| {
                vec![ConversationEntry {
                    from: group.name.clone(),
                    message: None,
                    created_at: None,
                    is_group: true,
                    chat_id: group.id.to_string(),
                    avatar: group.avatar.clone(),
                }]
            });
        }

        Ok(chats)
    }

    /// Directory lookup with per-call memoization.
    async fn cached_profile(
        &self,
        cache: &mut HashMap<UserId, Option<UserProfile>>,
        user_id: &UserId,
    ) -> Result<Option<UserProfile>, RelayError> {
        if let Some(profile) = cache.get(user_id) {
            return Ok(profile.clone());
        }
        let profile = self.directory.user(user_id).await?;
        cache.insert(user_id.clone(), profile.clone());
        Ok(profile)
    }

    /// Re-loads a record as its delivery view: sender profile attached
    /// and, when requested, the reply-to reference resolved with its own
    /// sender profile.
    async fn enrich(
        &self,
        record: MessageRecord,
        with_reference: bool,
    ) -> Result<EnrichedMessage, RelayError> {
        let sender = self.directory.user(&record.from).await?;

        let mut referenced = None;
        if with_reference
            && let Some(reference_id) = record.reference
            && let Some(referenced_record) = self.store.find_by_id(reference_id).await?
        {
            let referenced_sender = self.directory.user(&referenced_record.from).await?;
            referenced = Some(Box::new(ReferencedMessage {
                message: referenced_record,
                sender: referenced_sender,
            }));
        }

        Ok(EnrichedMessage {
            message: record,
            sender,
            referenced,
        })
    }
}
