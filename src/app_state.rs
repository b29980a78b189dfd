//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::ChatService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Chat service for all relay logic.
    pub chat_service: Arc<ChatService>,
    /// Upper bound in bytes for one inbound WebSocket message.
    pub ws_max_message_bytes: usize,
}
