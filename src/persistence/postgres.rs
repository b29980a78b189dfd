//! PostgreSQL implementation of the store and directory seams.
//!
//! The `messages` table is owned by the relay. The `users` and
//! `group_rosters` tables belong to the external user/group
//! collaborators; the relay only reads them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{Directory, MessageStore};
use crate::domain::{
    GroupId, GroupRecord, MessageId, MessageRecord, MessageStatus, NewMessage, RecipientKind,
    UserId, UserProfile,
};
use crate::error::RelayError;

/// Database row shape for a message record.
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    from_id: String,
    to_id: String,
    to_ref: String,
    is_group: bool,
    content: Option<String>,
    image_url: Option<Vec<String>>,
    reference_id: Option<Uuid>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const MESSAGE_COLUMNS: &str = "id, from_id, to_id, to_ref, is_group, content, image_url, \
     reference_id, status, created_at, updated_at";

/// PostgreSQL-backed message store and directory using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the relay-owned tables and indexes if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError::Persistence`] on database failure.
    pub async fn ensure_schema(&self) -> Result<(), RelayError> {
        let statements = [
            "CREATE TABLE IF NOT EXISTS messages (\
                 id UUID PRIMARY KEY, \
                 from_id TEXT NOT NULL, \
                 to_id TEXT NOT NULL, \
                 to_ref TEXT NOT NULL, \
                 is_group BOOLEAN NOT NULL, \
                 content TEXT, \
                 image_url TEXT[], \
                 reference_id UUID, \
                 status TEXT NOT NULL, \
                 created_at TIMESTAMPTZ NOT NULL, \
                 updated_at TIMESTAMPTZ NOT NULL)",
            "CREATE INDEX IF NOT EXISTS idx_messages_from_to \
                 ON messages (from_id, to_id, created_at)",
            "CREATE INDEX IF NOT EXISTS idx_messages_to \
                 ON messages (to_id, created_at)",
            "CREATE TABLE IF NOT EXISTS users (\
                 id TEXT PRIMARY KEY, \
                 user_name TEXT, \
                 avatar TEXT)",
            "CREATE TABLE IF NOT EXISTS group_rosters (\
                 id TEXT PRIMARY KEY, \
                 name TEXT NOT NULL, \
                 avatar TEXT, \
                 member_ids TEXT[] NOT NULL DEFAULT '{}')",
        ];
        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| RelayError::Persistence(e.to_string()))?;
        }
        Ok(())
    }
}

/// Converts a database row into a domain record.
fn row_to_record(row: MessageRow) -> MessageRecord {
    MessageRecord {
        id: MessageId::from_uuid(row.id),
        from: UserId::new(row.from_id),
        to: row.to_id,
        to_ref: match row.to_ref.as_str() {
            "Group" => RecipientKind::Group,
            _ => RecipientKind::User,
        },
        is_group: row.is_group,
        content: row.content,
        image_url: row.image_url,
        reference: row.reference_id.map(MessageId::from_uuid),
        status: match row.status.as_str() {
            "DELETED" => MessageStatus::Deleted,
            _ => MessageStatus::Active,
        },
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

#[async_trait]
impl MessageStore for PostgresStore {
    async fn create(&self, new_message: NewMessage) -> Result<MessageRecord, RelayError> {
        let record = MessageRecord::from_new(new_message);
        sqlx::query(
            "INSERT INTO messages \
                 (id, from_id, to_id, to_ref, is_group, content, image_url, reference_id, \
                  status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(record.id.as_uuid())
        .bind(record.from.as_str())
        .bind(&record.to)
        .bind(record.to_ref.as_str())
        .bind(record.is_group)
        .bind(&record.content)
        .bind(&record.image_url)
        .bind(record.reference.as_ref().map(MessageId::as_uuid))
        .bind(record.status.as_str())
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RelayError::Persistence(e.to_string()))?;

        Ok(record)
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<MessageRecord>, RelayError> {
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RelayError::Persistence(e.to_string()))?;

        Ok(row.map(row_to_record))
    }

    async fn find_conversation(
        &self,
        user_id: &UserId,
        chat_with_id: &UserId,
        is_group: bool,
    ) -> Result<Vec<MessageRecord>, RelayError> {
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE is_group = $3 \
               AND ((from_id = $1 AND to_id = $2) OR (from_id = $2 AND to_id = $1)) \
             ORDER BY created_at ASC"
        ))
        .bind(user_id.as_str())
        .bind(chat_with_id.as_str())
        .bind(is_group)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RelayError::Persistence(e.to_string()))?;

        Ok(rows.into_iter().map(row_to_record).collect())
    }

    async fn find_for_group(&self, group_id: &GroupId) -> Result<Vec<MessageRecord>, RelayError> {
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE is_group AND to_id = $1 ORDER BY created_at ASC"
        ))
        .bind(group_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RelayError::Persistence(e.to_string()))?;

        Ok(rows.into_iter().map(row_to_record).collect())
    }

    async fn find_involving(
        &self,
        user_id: &UserId,
        group_ids: &[GroupId],
    ) -> Result<Vec<MessageRecord>, RelayError> {
        let group_id_strings: Vec<String> =
            group_ids.iter().map(|g| g.as_str().to_string()).collect();
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE status = 'ACTIVE' \
               AND (from_id = $1 \
                    OR (NOT is_group AND to_id = $1) \
                    OR (is_group AND to_id = ANY($2))) \
             ORDER BY created_at DESC"
        ))
        .bind(user_id.as_str())
        .bind(&group_id_strings)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RelayError::Persistence(e.to_string()))?;

        Ok(rows.into_iter().map(row_to_record).collect())
    }

    async fn update_status(
        &self,
        id: MessageId,
        status: MessageStatus,
    ) -> Result<Option<MessageRecord>, RelayError> {
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            "UPDATE messages \
             SET updated_at = CASE WHEN status = $2 THEN updated_at ELSE now() END, \
                 status = $2 \
             WHERE id = $1 \
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RelayError::Persistence(e.to_string()))?;

        Ok(row.map(row_to_record))
    }
}

#[async_trait]
impl Directory for PostgresStore {
    async fn user(&self, user_id: &UserId) -> Result<Option<UserProfile>, RelayError> {
        let row = sqlx::query_as::<_, (String, Option<String>, Option<String>)>(
            "SELECT id, user_name, avatar FROM users WHERE id = $1",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RelayError::Persistence(e.to_string()))?;

        Ok(row.map(|(id, user_name, avatar)| UserProfile {
            id: UserId::new(id),
            user_name,
            avatar,
        }))
    }

    async fn groups_of(&self, user_id: &UserId) -> Result<Vec<GroupRecord>, RelayError> {
        let rows = sqlx::query_as::<_, (String, String, Option<String>, Vec<String>)>(
            "SELECT id, name, avatar, member_ids FROM group_rosters WHERE $1 = ANY(member_ids)",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RelayError::Persistence(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(id, name, avatar, member_ids)| GroupRecord {
                id: GroupId::new(id),
                name,
                avatar,
                member_ids: member_ids.into_iter().map(UserId::new).collect(),
            })
            .collect())
    }
}
