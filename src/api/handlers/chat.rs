//! Conversation overview handler.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{ChatOverviewParams, ChatOverviewResponse, ConversationEntryDto};
use crate::app_state::AppState;
use crate::domain::UserId;
use crate::error::{ErrorResponse, RelayError};

/// `GET /chats` — Conversation overview for a user.
///
/// Lists every active conversation the user participates in, grouped by
/// partner or group display name, with the newest message first. Durable
/// groups without any message yet appear as placeholder entries.
///
/// # Errors
///
/// Returns [`RelayError`] when the `userId` value is blank or names an
/// unknown user.
#[utoipa::path(
    get,
    path = "/api/v1/chats",
    tag = "Chats",
    summary = "Conversation overview",
    description = "Returns the user's active conversations grouped per partner or group, newest message first, including placeholder entries for message-less groups.",
    params(ChatOverviewParams),
    responses(
        (status = 200, description = "Conversation overview", body = ChatOverviewResponse),
        (status = 400, description = "Missing or blank userId", body = ErrorResponse),
        (status = 404, description = "Unknown user", body = ErrorResponse),
    )
)]
pub async fn get_user_chats(
    State(state): State<AppState>,
    Query(params): Query<ChatOverviewParams>,
) -> Result<impl IntoResponse, RelayError> {
    let user_id = UserId::new(&params.user_id);
    if user_id.is_empty() {
        return Err(RelayError::Validation(
            "userId query parameter required".to_string(),
        ));
    }

    let chats = state.chat_service.conversation_overview(&user_id).await?;
    let chats = chats
        .into_iter()
        .map(|(key, entries)| {
            (
                key,
                entries.into_iter().map(ConversationEntryDto::from).collect(),
            )
        })
        .collect();

    Ok(Json(ChatOverviewResponse { chats }))
}

/// Chat routes mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/chats", get(get_user_chats))
}
