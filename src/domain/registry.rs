//! Connection registry: live user → connection handle mapping.
//!
//! [`ConnectionRegistry`] stores the last known connection handle for each
//! user identity behind a `RwLock<HashMap<...>>`. Registration is
//! last-connect-wins; lookups return the last known handle without any
//! liveness guarantee, so callers treat the result as best-effort and
//! verify on use.

use std::collections::HashMap;

use tokio::sync::{RwLock, mpsc};

use super::event::ChatEvent;
use super::{ConnectionId, UserId};

/// Handle usable to push events to exactly one live transport session.
///
/// Holds the sender half of the session's unbounded channel; a writer
/// task owned by the transport layer drains the receiver into the
/// WebSocket sink. Cloning is cheap and shares the same session.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    sender: mpsc::UnboundedSender<ChatEvent>,
}

impl ConnectionHandle {
    /// Creates a handle over the given session event channel.
    #[must_use]
    pub fn new(id: ConnectionId, sender: mpsc::UnboundedSender<ChatEvent>) -> Self {
        Self { id, sender }
    }

    /// Returns the unique id of the underlying transport session.
    #[must_use]
    pub const fn connection_id(&self) -> ConnectionId {
        self.id
    }

    /// Pushes an event to the session, fire-and-forget.
    ///
    /// Returns `false` when the session's writer task is gone; the event
    /// is silently dropped in that case.
    pub fn push(&self, event: ChatEvent) -> bool {
        self.sender.send(event).is_ok()
    }

    /// Returns `true` if the underlying session can no longer receive.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Central store mapping user identities to their live connection handle.
///
/// # Concurrency
///
/// Shared by every connection task. Each operation takes the lock for a
/// single insert/lookup/remove, so individual entries are updated
/// atomically; callers must re-resolve after any await rather than cache
/// a handle across suspension points.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<UserId, ConnectionHandle>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Associates `user_id` with `handle`, discarding any prior
    /// association for that identity (last-connect-wins).
    pub async fn register(&self, user_id: UserId, handle: ConnectionHandle) {
        let mut map = self.connections.write().await;
        if let Some(previous) = map.insert(user_id.clone(), handle) {
            tracing::debug!(
                user = %user_id,
                replaced = %previous.connection_id(),
                "connection replaced by reconnect"
            );
        }
    }

    /// Returns the last known handle for `user_id`, or `None` if the
    /// identity never registered.
    ///
    /// Does not verify transport liveness.
    pub async fn lookup(&self, user_id: &UserId) -> Option<ConnectionHandle> {
        self.connections.read().await.get(user_id).cloned()
    }

    /// Best-effort cleanup on session close.
    ///
    /// Removes the entry for `user_id` only when it still refers to the
    /// session identified by `connection_id`; a reconnect that already
    /// replaced the entry is left untouched. Returns `true` when an entry
    /// was removed.
    pub async fn deregister(&self, user_id: &UserId, connection_id: ConnectionId) -> bool {
        let mut map = self.connections.write().await;
        match map.get(user_id) {
            Some(handle) if handle.connection_id() == connection_id => {
                map.remove(user_id);
                true
            }
            _ => false,
        }
    }

    /// Returns the number of tracked identities.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Returns `true` if no identity is tracked.
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}
