//! Live group membership table.
//!
//! [`GroupMembership`] tracks which users have joined each group's
//! broadcast channel during this process lifetime. It is built solely by
//! explicit join events, never derived from the durable group roster,
//! and is lost on restart. A user can be a durable group member yet
//! absent from this live set until it explicitly joins.

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use super::{GroupId, UserId};

/// In-memory `group → set of user` broadcast membership.
///
/// Shared by every connection task behind a `RwLock<HashMap<...>>`; each
/// operation takes the lock for a single mutation or read, so callers
/// must re-read membership after any await instead of caching it.
#[derive(Debug, Default)]
pub struct GroupMembership {
    groups: RwLock<HashMap<GroupId, HashSet<UserId>>>,
}

impl GroupMembership {
    /// Creates an empty membership table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
        }
    }

    /// Adds `user_id` to the broadcast set for `group_id`, creating the
    /// set if absent. Idempotent: repeated joins are no-ops beyond the
    /// first.
    pub async fn join(&self, group_id: GroupId, user_id: UserId) {
        let mut map = self.groups.write().await;
        let inserted = map.entry(group_id.clone()).or_default().insert(user_id.clone());
        if inserted {
            tracing::info!(user = %user_id, group = %group_id, "user joined group channel");
        }
    }

    /// Removes `user_id` from the broadcast set for `group_id`. No-op
    /// when the user never joined. Membership is otherwise monotonic for
    /// the life of the process; nothing expires on disconnect.
    pub async fn leave(&self, group_id: &GroupId, user_id: &UserId) {
        let mut map = self.groups.write().await;
        if let Some(members) = map.get_mut(group_id)
            && members.remove(user_id)
        {
            tracing::info!(user = %user_id, group = %group_id, "user left group channel");
        }
    }

    /// Returns the current live membership set for `group_id` (empty if
    /// nobody joined in this process lifetime).
    pub async fn members(&self, group_id: &GroupId) -> HashSet<UserId> {
        self.groups
            .read()
            .await
            .get(group_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the number of groups with at least one recorded join.
    pub async fn group_count(&self) -> usize {
        self.groups.read().await.len()
    }
}
