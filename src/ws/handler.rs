//! Axum WebSocket upgrade handler.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::domain::UserId;
use crate::error::RelayError;

/// Query parameters of the `/ws` upgrade request.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Identity asserted by the connecting client. Trusted as-is; there
    /// is no authentication token.
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

/// `GET /ws?userId=…` — Upgrade HTTP connection to the socket channel.
///
/// # Errors
///
/// Returns [`RelayError::Validation`] (HTTP 400) when the `userId` query
/// value is missing or blank; the upgrade is rejected before completing.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, RelayError> {
    let user_id = query
        .user_id
        .map(UserId::new)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| RelayError::Validation("missing userId query parameter".to_string()))?;

    let service = Arc::clone(&state.chat_service);
    Ok(ws
        .max_message_size(state.ws_max_message_bytes)
        .on_upgrade(move |socket| run_connection(socket, service, user_id)))
}
