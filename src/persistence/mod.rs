//! Persistence layer: message store and directory seams.
//!
//! The relay core talks to durable storage only through the
//! [`MessageStore`] and [`Directory`] traits. The PostgreSQL
//! implementation backs production deployments; the in-memory
//! implementation backs tests and runs with persistence disabled.

pub mod memory;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;

use crate::domain::{
    GroupId, GroupRecord, MessageId, MessageRecord, MessageStatus, NewMessage, UserId, UserProfile,
};
use crate::error::RelayError;

/// Durable, append-mostly store of message records.
///
/// The store assigns ids and timestamps on create and owns the one-way
/// `ACTIVE` → `DELETED` status transition. Records are never hard-deleted.
#[async_trait]
pub trait MessageStore: Send + Sync + fmt::Debug {
    /// Creates a message record from the given input and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] when the write fails; the
    /// message is then treated as not sent.
    async fn create(&self, new_message: NewMessage) -> Result<MessageRecord, RelayError>;

    /// Looks up a record by id.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on storage failure.
    async fn find_by_id(&self, id: MessageId) -> Result<Option<MessageRecord>, RelayError>;

    /// Returns all records exchanged between two user identities, in
    /// either direction, filtered on the `is_group` flag and ordered by
    /// creation time ascending.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on storage failure.
    async fn find_conversation(
        &self,
        user_id: &UserId,
        chat_with_id: &UserId,
        is_group: bool,
    ) -> Result<Vec<MessageRecord>, RelayError>;

    /// Returns all records addressed to the given group, ordered by
    /// creation time ascending.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on storage failure.
    async fn find_for_group(&self, group_id: &GroupId) -> Result<Vec<MessageRecord>, RelayError>;

    /// Returns every `ACTIVE` record involving the user — as sender, as
    /// private recipient, or addressed to one of `group_ids` — ordered by
    /// creation time descending. Backs the REST conversation overview.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on storage failure.
    async fn find_involving(
        &self,
        user_id: &UserId,
        group_ids: &[GroupId],
    ) -> Result<Vec<MessageRecord>, RelayError>;

    /// Transitions a record to the given status, returning the updated
    /// record, or `None` when no record with that id exists. Setting a
    /// status the record already has succeeds and leaves it unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on storage failure.
    async fn update_status(
        &self,
        id: MessageId,
        status: MessageStatus,
    ) -> Result<Option<MessageRecord>, RelayError>;
}

/// Read-only interface to the external user and group collaborators.
///
/// The relay core reads profiles for message enrichment and the durable
/// group roster for the REST conversation overview; it never writes
/// either, and live fan-out decisions never consult the durable roster.
#[async_trait]
pub trait Directory: Send + Sync + fmt::Debug {
    /// Looks up a user profile by identity.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on storage failure.
    async fn user(&self, user_id: &UserId) -> Result<Option<UserProfile>, RelayError>;

    /// Returns the durable group records the user belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on storage failure.
    async fn groups_of(&self, user_id: &UserId) -> Result<Vec<GroupRecord>, RelayError>;
}
