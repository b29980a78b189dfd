//! DTOs for the conversation overview endpoint.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query parameters for the conversation overview.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ChatOverviewParams {
    /// Identity of the user whose conversations to list.
    #[serde(rename = "userId")]
    pub user_id: String,
}

/// One conversation entry: a message summary or a group placeholder.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversationEntryDto {
    /// Display name of the sender.
    pub from: String,
    /// Text body of the message, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Creation timestamp; absent for group placeholder entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Whether the conversation is a group channel.
    pub is_group: bool,
    /// Identity of the conversation partner or group.
    pub chat_id: String,
    /// Avatar of the conversation partner or group, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Conversation overview response: entries grouped per conversation
/// display name, newest message first within each conversation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChatOverviewResponse {
    /// Conversations keyed by partner or group display name.
    pub chats: HashMap<String, Vec<ConversationEntryDto>>,
}

impl From<crate::service::ConversationEntry> for ConversationEntryDto {
    fn from(entry: crate::service::ConversationEntry) -> Self {
        Self {
            from: entry.from,
            message: entry.message,
            created_at: entry.created_at,
            is_group: entry.is_group,
            chat_id: entry.chat_id,
            avatar: entry.avatar,
        }
    }
}
