//! In-memory implementation of the store and directory seams.
//!
//! Backs the test suite and deployments running with persistence
//! disabled. Single-process only; contents are lost on restart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{Directory, MessageStore};
use crate::domain::{
    GroupId, GroupRecord, MessageId, MessageRecord, MessageStatus, NewMessage, UserId, UserProfile,
};
use crate::error::RelayError;

/// In-memory message store and directory.
///
/// Messages live in an append-only vector; profiles and groups are
/// seeded through [`MemoryStore::insert_user`] / [`MemoryStore::insert_group`]
/// to stand in for the external collaborators.
#[derive(Debug, Default)]
pub struct MemoryStore {
    messages: RwLock<Vec<MessageRecord>>,
    users: RwLock<HashMap<UserId, UserProfile>>,
    groups: RwLock<Vec<GroupRecord>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a user profile, replacing any existing profile for the same
    /// identity.
    pub async fn insert_user(&self, profile: UserProfile) {
        self.users.write().await.insert(profile.id.clone(), profile);
    }

    /// Seeds a durable group record.
    pub async fn insert_group(&self, group: GroupRecord) {
        self.groups.write().await.push(group);
    }

    /// Returns the number of stored message records.
    pub async fn message_count(&self) -> usize {
        self.messages.read().await.len()
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn create(&self, new_message: NewMessage) -> Result<MessageRecord, RelayError> {
        let record = MessageRecord::from_new(new_message);
        self.messages.write().await.push(record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<MessageRecord>, RelayError> {
        Ok(self
            .messages
            .read()
            .await
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    async fn find_conversation(
        &self,
        user_id: &UserId,
        chat_with_id: &UserId,
        is_group: bool,
    ) -> Result<Vec<MessageRecord>, RelayError> {
        let mut records: Vec<MessageRecord> = self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| {
                m.is_group == is_group
                    && ((m.from == *user_id && m.to == chat_with_id.as_str())
                        || (m.from == *chat_with_id && m.to == user_id.as_str()))
            })
            .cloned()
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }

    async fn find_for_group(&self, group_id: &GroupId) -> Result<Vec<MessageRecord>, RelayError> {
        let mut records: Vec<MessageRecord> = self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| m.is_group && m.to == group_id.as_str())
            .cloned()
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }

    async fn find_involving(
        &self,
        user_id: &UserId,
        group_ids: &[GroupId],
    ) -> Result<Vec<MessageRecord>, RelayError> {
        let mut records: Vec<MessageRecord> = self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| {
                m.status == MessageStatus::Active
                    && (m.from == *user_id
                        || (!m.is_group && m.to == user_id.as_str())
                        || (m.is_group && group_ids.iter().any(|g| m.to == g.as_str())))
            })
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn update_status(
        &self,
        id: MessageId,
        status: MessageStatus,
    ) -> Result<Option<MessageRecord>, RelayError> {
        let mut messages = self.messages.write().await;
        let Some(record) = messages.iter_mut().find(|m| m.id == id) else {
            return Ok(None);
        };
        if record.status != status {
            record.status = status;
            record.updated_at = Utc::now();
        }
        Ok(Some(record.clone()))
    }
}

#[async_trait]
impl Directory for MemoryStore {
    async fn user(&self, user_id: &UserId) -> Result<Option<UserProfile>, RelayError> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn groups_of(&self, user_id: &UserId) -> Result<Vec<GroupRecord>, RelayError> {
        Ok(self
            .groups
            .read()
            .await
            .iter()
            .filter(|g| g.member_ids.contains(user_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn private(from: &str, to: &str, content: &str) -> NewMessage {
        NewMessage::private(
            UserId::new(from),
            &UserId::new(to),
            Some(content.to_string()),
            None,
            None,
        )
    }

    #[tokio::test]
    async fn create_assigns_id_and_persists() {
        let store = MemoryStore::new();
        let record = store.create(private("alice", "bob", "hi")).await;
        let Ok(record) = record else {
            panic!("create failed");
        };

        let found = store.find_by_id(record.id).await;
        let Ok(Some(found)) = found else {
            panic!("record must be findable");
        };
        assert_eq!(found.content.as_deref(), Some("hi"));
        assert_eq!(store.message_count().await, 1);
    }

    #[tokio::test]
    async fn conversation_includes_both_directions_ascending() {
        let store = MemoryStore::new();
        let _ = store.create(private("alice", "bob", "first")).await;
        let _ = store.create(private("bob", "alice", "second")).await;
        let _ = store.create(private("alice", "carol", "other chat")).await;

        let records = store
            .find_conversation(&UserId::new("bob"), &UserId::new("alice"), false)
            .await;
        let Ok(records) = records else {
            panic!("find failed");
        };
        assert_eq!(records.len(), 2);
        let contents: Vec<_> = records.iter().filter_map(|m| m.content.as_deref()).collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn group_history_only_matches_group_records() {
        let store = MemoryStore::new();
        let _ = store
            .create(NewMessage::group(
                UserId::new("alice"),
                &GroupId::new("g1"),
                Some("hello group".to_string()),
                None,
                None,
            ))
            .await;
        // Private message whose recipient id collides with the group id.
        let _ = store.create(private("alice", "g1", "not a group message")).await;

        let records = store.find_for_group(&GroupId::new("g1")).await;
        let Ok(records) = records else {
            panic!("find failed");
        };
        assert_eq!(records.len(), 1);
        assert_eq!(records.first().and_then(|m| m.content.as_deref()), Some("hello group"));
    }

    #[tokio::test]
    async fn update_status_is_one_way_and_idempotent() {
        let store = MemoryStore::new();
        let record = store.create(private("alice", "bob", "hi")).await;
        let Ok(record) = record else {
            panic!("create failed");
        };

        let updated = store.update_status(record.id, MessageStatus::Deleted).await;
        let Ok(Some(updated)) = updated else {
            panic!("update failed");
        };
        assert_eq!(updated.status, MessageStatus::Deleted);
        assert!(updated.updated_at >= updated.created_at);

        // Second delete succeeds and the record stays deleted.
        let again = store.update_status(record.id, MessageStatus::Deleted).await;
        let Ok(Some(again)) = again else {
            panic!("second update failed");
        };
        assert_eq!(again.status, MessageStatus::Deleted);
    }

    #[tokio::test]
    async fn update_status_of_unknown_record_is_absent() {
        let store = MemoryStore::new();
        let result = store
            .update_status(MessageId::new(), MessageStatus::Deleted)
            .await;
        let Ok(result) = result else {
            panic!("update errored");
        };
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn find_involving_filters_deleted_and_orders_descending() {
        let store = MemoryStore::new();
        let first = store.create(private("alice", "bob", "first")).await;
        let _ = store.create(private("bob", "alice", "second")).await;
        let Ok(first) = first else {
            panic!("create failed");
        };
        let _ = store.update_status(first.id, MessageStatus::Deleted).await;

        let records = store.find_involving(&UserId::new("alice"), &[]).await;
        let Ok(records) = records else {
            panic!("find failed");
        };
        assert_eq!(records.len(), 1);
        assert_eq!(records.first().and_then(|m| m.content.as_deref()), Some("second"));
    }

    #[tokio::test]
    async fn directory_resolves_seeded_users_and_groups() {
        let store = MemoryStore::new();
        store
            .insert_user(UserProfile {
                id: UserId::new("alice"),
                user_name: Some("Alice".to_string()),
                avatar: None,
            })
            .await;
        store
            .insert_group(GroupRecord {
                id: GroupId::new("g1"),
                name: "team".to_string(),
                avatar: None,
                member_ids: vec![UserId::new("alice")],
            })
            .await;

        let profile = store.user(&UserId::new("alice")).await;
        let Ok(Some(profile)) = profile else {
            panic!("profile missing");
        };
        assert_eq!(profile.user_name.as_deref(), Some("Alice"));

        let groups = store.groups_of(&UserId::new("alice")).await;
        let Ok(groups) = groups else {
            panic!("groups lookup failed");
        };
        assert_eq!(groups.len(), 1);

        let none = store.groups_of(&UserId::new("bob")).await;
        let Ok(none) = none else {
            panic!("groups lookup failed");
        };
        assert!(none.is_empty());
    }
}
