//! WebSocket session state machine.
//!
//! Runs the per-connection lifecycle: register the asserted identity in
//! the connection registry, spawn a writer task owning the sink half,
//! dispatch each inbound event as its own unit of work, and perform
//! guarded deregistration on close.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::messages::ClientEvent;
use crate::domain::{ChatEvent, ConnectionHandle, ConnectionId, UserId};
use crate::error::RelayError;
use crate::service::ChatService;

/// Runs one WebSocket session until the transport closes.
///
/// The handle registered for `user_id` stays valid for the lifetime of
/// the writer task; sends to it after close are silently dropped.
pub async fn run_connection(socket: WebSocket, service: Arc<ChatService>, user_id: UserId) {
    let (ws_tx, mut ws_rx) = socket.split();
    let (event_tx, event_rx) = mpsc::unbounded_channel::<ChatEvent>();
    let handle = ConnectionHandle::new(ConnectionId::new(), event_tx);
    let connection_id = handle.connection_id();

    service
        .registry()
        .register(user_id.clone(), handle.clone())
        .await;
    tracing::info!(user = %user_id, connection = %connection_id, "ws session open");

    let writer = tokio::spawn(writer_task(ws_tx, event_rx));

    while let Some(frame) = ws_rx.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                dispatch_frame(&service, &handle, text.as_str());
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(user = %user_id, error = %e, "ws receive error");
                break;
            }
        }
    }

    // Guarded cleanup: a reconnect that already replaced the entry wins.
    let removed = service.registry().deregister(&user_id, connection_id).await;
    writer.abort();
    tracing::info!(
        user = %user_id,
        connection = %connection_id,
        deregistered = removed,
        "ws session closed"
    );
}

/// Writer task: drains session events into the WebSocket sink as JSON
/// text frames. Exits when the sink fails or the channel closes.
async fn writer_task(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut event_rx: mpsc::UnboundedReceiver<ChatEvent>,
) {
    while let Some(event) = event_rx.recv().await {
        let Ok(json) = serde_json::to_string(&event) else {
            continue;
        };
        if ws_tx.send(Message::text(json)).await.is_err() {
            break;
        }
    }
}

/// Parses one inbound frame and spawns its handler.
///
/// Each event runs as an independent task, so a slow history query never
/// blocks the session's typing indicators. Parse failures and handler
/// errors are reported only to this connection as an `error` event.
fn dispatch_frame(service: &Arc<ChatService>, handle: &ConnectionHandle, text: &str) {
    match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => {
            let service = Arc::clone(service);
            let handle = handle.clone();
            tokio::spawn(async move {
                if let Err(err) = handle_event(&service, &handle, event).await {
                    tracing::debug!(code = err.error_code(), error = %err, "event failed");
                    let _ = handle.push(ChatEvent::from(&err));
                }
            });
        }
        Err(e) => {
            let err = RelayError::Validation(e.to_string());
            let _ = handle.push(ChatEvent::from(&err));
        }
    }
}

/// Dispatches a validated client event to the chat service.
async fn handle_event(
    service: &ChatService,
    handle: &ConnectionHandle,
    event: ClientEvent,
) -> Result<(), RelayError> {
    match event {
        ClientEvent::SendPrivateMessage {
            from,
            to,
            content,
            image_url,
            reference,
        } => {
            service
                .send_private_message(from, to, content, image_url, reference)
                .await?;
        }
        ClientEvent::SendGroupMessage {
            from,
            to,
            content,
            image_url,
            reference,
        } => {
            service
                .send_group_message(from, to, content, image_url, reference)
                .await?;
        }
        ClientEvent::JoinGroup { group_id, user_id } => {
            service.join_group(group_id, user_id).await;
        }
        ClientEvent::LeaveGroup { group_id, user_id } => {
            service.leave_group(group_id, user_id).await;
        }
        ClientEvent::FetchMessages {
            user_id,
            chat_with_id,
            is_group,
        } => {
            let history = service
                .fetch_messages(&user_id, &chat_with_id, is_group)
                .await?;
            let _ = handle.push(ChatEvent::MessageHistory(history));
        }
        ClientEvent::DeleteMessage { message, user_id } => {
            service
                .delete_message(message.id, message.from, user_id)
                .await?;
        }
        ClientEvent::Typing {
            to,
            typing,
            is_group,
            from,
        } => {
            service.typing(from, &to, typing, is_group).await;
        }
    }
    Ok(())
}
