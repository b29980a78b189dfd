//! Fan-out engine: resolves recipients and dispatches events.
//!
//! Pure resolution + dispatch utility over the connection registry. Every
//! dispatch resolves handles at call time, never from state captured
//! before an await, so a reconnect that replaced a user's connection
//! mid-operation receives the event on its current session.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::{ChatEvent, ConnectionRegistry, UserId};

/// Resolves sets of user identities to live connection handles and pushes
/// events to them, fire-and-forget.
#[derive(Debug, Clone)]
pub struct FanoutEngine {
    registry: Arc<ConnectionRegistry>,
}

impl FanoutEngine {
    /// Creates a fan-out engine over the given registry.
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Dispatches `event` to every target identity with a live handle.
    ///
    /// Identities without a registered handle are skipped, handles whose
    /// session already closed are skipped, and handles are de-duplicated
    /// by connection id so a single connection backing two logical
    /// recipients receives one copy, not two. Returns the number of
    /// handles the event was pushed to.
    pub async fn dispatch<'a, I>(&self, targets: I, event: &ChatEvent) -> usize
    where
        I: IntoIterator<Item = &'a UserId>,
    {
        let mut seen = HashSet::new();
        let mut delivered = 0;
        for user_id in targets {
            let Some(handle) = self.registry.lookup(user_id).await else {
                continue;
            };
            if handle.is_closed() || !seen.insert(handle.connection_id()) {
                continue;
            }
            if handle.push(event.clone()) {
                delivered += 1;
            }
        }
        delivered
    }
}
