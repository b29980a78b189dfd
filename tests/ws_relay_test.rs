//! End-to-end tests for the socket channel: connection registration,
//! private and group routing, history, deletion, typing, and per-event
//! error reporting.

#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use parley_gateway::api;
use parley_gateway::app_state::AppState;
use parley_gateway::domain::{ConnectionRegistry, GroupMembership, UserId, UserProfile};
use parley_gateway::persistence::memory::MemoryStore;
use parley_gateway::persistence::{Directory, MessageStore};
use parley_gateway::service::ChatService;
use parley_gateway::ws::handler::ws_handler;

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Starts the gateway on an ephemeral port backed by an in-memory store.
async fn start_test_server() -> (SocketAddr, Arc<MemoryStore>) {
    let memory = Arc::new(MemoryStore::new());
    let store: Arc<dyn MessageStore> = Arc::clone(&memory) as Arc<dyn MessageStore>;
    let directory: Arc<dyn Directory> = Arc::clone(&memory) as Arc<dyn Directory>;
    let chat_service = Arc::new(ChatService::new(
        store,
        directory,
        Arc::new(ConnectionRegistry::new()),
        Arc::new(GroupMembership::new()),
    ));
    let app_state = AppState {
        chat_service,
        ws_max_message_bytes: 64 * 1024,
    };

    let app = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .with_state(app_state);

    let listener = TcpListener::bind("127.0.0.1:0").await;
    let Ok(listener) = listener else {
        panic!("failed to bind test listener");
    };
    let addr = listener.local_addr();
    let Ok(addr) = addr else {
        panic!("failed to read local addr");
    };

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (addr, memory)
}

/// Opens a socket session asserting the given user identity.
async fn connect(addr: SocketAddr, user_id: &str) -> WsClient {
    let url = format!("ws://{addr}/ws?userId={user_id}");
    let connected = tokio_tungstenite::connect_async(url).await;
    let Ok((ws, _)) = connected else {
        panic!("ws connect failed for {user_id}");
    };
    ws
}

/// Sends one client event frame.
async fn send_frame(ws: &mut WsClient, json: serde_json::Value) {
    let sent = ws.send(Message::text(json.to_string())).await;
    let Ok(()) = sent else {
        panic!("send failed");
    };
}

/// Receives the next text frame as JSON within a short timeout.
async fn recv_event(ws: &mut WsClient) -> serde_json::Value {
    let deadline = Duration::from_secs(2);
    loop {
        let frame = tokio::time::timeout(deadline, ws.next()).await;
        let Ok(Some(Ok(frame))) = frame else {
            panic!("expected a frame before timeout");
        };
        if let Message::Text(text) = frame {
            let parsed = serde_json::from_str(text.as_str());
            let Ok(value) = parsed else {
                panic!("frame is not valid JSON: {text}");
            };
            return value;
        }
    }
}

/// Asserts no text frame arrives within a short quiet window.
async fn assert_silent(ws: &mut WsClient) {
    let frame = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;
    if let Ok(Some(Ok(Message::Text(text)))) = frame {
        panic!("expected silence, got frame: {text}");
    }
}

#[tokio::test]
async fn private_message_round_trip() {
    let (addr, _store) = start_test_server().await;
    let mut alice = connect(addr, "alice").await;
    let mut bob = connect(addr, "bob").await;

    send_frame(
        &mut alice,
        serde_json::json!({
            "event": "send_private_message",
            "data": {"from": "alice", "to": "bob", "content": "hi"}
        }),
    )
    .await;

    for ws in [&mut alice, &mut bob] {
        let event = recv_event(ws).await;
        assert_eq!(event.get("event").and_then(|v| v.as_str()), Some("private_message"));
        let data = event.get("data");
        let Some(data) = data else {
            panic!("missing data payload");
        };
        assert_eq!(data.get("content").and_then(|v| v.as_str()), Some("hi"));
        assert_eq!(data.get("status").and_then(|v| v.as_str()), Some("ACTIVE"));
        assert_eq!(data.get("isGroup").and_then(|v| v.as_bool()), Some(false));
    }
}

#[tokio::test]
async fn offline_recipient_catches_up_via_history() {
    let (addr, _store) = start_test_server().await;
    let mut alice = connect(addr, "alice").await;

    {
        let mut bob = connect(addr, "bob").await;
        send_frame(
            &mut alice,
            serde_json::json!({
                "event": "send_private_message",
                "data": {"from": "alice", "to": "bob", "content": "first"}
            }),
        )
        .await;
        let _ = recv_event(&mut alice).await;
        let _ = recv_event(&mut bob).await;
        let closed = bob.close(None).await;
        let Ok(()) = closed else {
            panic!("close failed");
        };
    }

    // Bob is gone; the second message is persisted without live delivery.
    send_frame(
        &mut alice,
        serde_json::json!({
            "event": "send_private_message",
            "data": {"from": "alice", "to": "bob", "content": "second"}
        }),
    )
    .await;
    let _ = recv_event(&mut alice).await;

    // Bob reconnects and fetches the conversation.
    let mut bob = connect(addr, "bob").await;
    send_frame(
        &mut bob,
        serde_json::json!({
            "event": "fetch_messages",
            "data": {"userId": "bob", "chatWithId": "alice", "isGroup": false}
        }),
    )
    .await;

    let event = recv_event(&mut bob).await;
    assert_eq!(event.get("event").and_then(|v| v.as_str()), Some("message_history"));
    let contents: Vec<&str> = event
        .get("data")
        .and_then(|v| v.as_array())
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| e.get("content").and_then(|c| c.as_str()))
                .collect()
        })
        .unwrap_or_default();
    assert_eq!(contents, vec!["first", "second"]);
}

#[tokio::test]
async fn group_message_reaches_live_members_only() {
    let (addr, _store) = start_test_server().await;
    let mut alice = connect(addr, "alice").await;
    let mut bob = connect(addr, "bob").await;
    let mut carol = connect(addr, "carol").await;

    for (ws, user) in [(&mut alice, "alice"), (&mut bob, "bob")] {
        send_frame(
            ws,
            serde_json::json!({
                "event": "join_group",
                "data": {"groupId": "g1", "userId": user}
            }),
        )
        .await;
    }
    // Joins run as concurrent units of work; let them settle.
    tokio::time::sleep(Duration::from_millis(100)).await;

    send_frame(
        &mut alice,
        serde_json::json!({
            "event": "send_group_message",
            "data": {"from": "alice", "to": "g1", "content": "hello"}
        }),
    )
    .await;

    for ws in [&mut alice, &mut bob] {
        let event = recv_event(ws).await;
        assert_eq!(event.get("event").and_then(|v| v.as_str()), Some("group_message"));
        assert_eq!(
            event
                .get("data")
                .and_then(|d| d.get("content"))
                .and_then(|v| v.as_str()),
            Some("hello")
        );
    }
    assert_silent(&mut carol).await;
}

#[tokio::test]
async fn delete_is_authorized_and_broadcast() {
    let (addr, _store) = start_test_server().await;
    let mut alice = connect(addr, "alice").await;
    let mut bob = connect(addr, "bob").await;

    send_frame(
        &mut alice,
        serde_json::json!({
            "event": "send_private_message",
            "data": {"from": "alice", "to": "bob", "content": "oops"}
        }),
    )
    .await;
    let sent = recv_event(&mut alice).await;
    let _ = recv_event(&mut bob).await;
    let message_id = sent
        .get("data")
        .and_then(|d| d.get("id"))
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let Some(message_id) = message_id else {
        panic!("missing message id");
    };

    // Bob cannot delete Alice's message.
    send_frame(
        &mut bob,
        serde_json::json!({
            "event": "delete_message",
            "data": {"message": {"id": message_id, "from": "alice"}, "userId": "bob"}
        }),
    )
    .await;
    let error = recv_event(&mut bob).await;
    assert_eq!(error.get("event").and_then(|v| v.as_str()), Some("error"));
    assert_eq!(
        error
            .get("data")
            .and_then(|d| d.get("code"))
            .and_then(|v| v.as_u64()),
        Some(4001)
    );

    // Alice deletes her own message; both sides are notified.
    send_frame(
        &mut alice,
        serde_json::json!({
            "event": "delete_message",
            "data": {"message": {"id": message_id, "from": "alice"}, "userId": "alice"}
        }),
    )
    .await;
    for ws in [&mut alice, &mut bob] {
        let event = recv_event(ws).await;
        assert_eq!(event.get("event").and_then(|v| v.as_str()), Some("message_deleted"));
        assert_eq!(
            event
                .get("data")
                .and_then(|d| d.get("messageId"))
                .and_then(|v| v.as_str()),
            Some(message_id.as_str())
        );
    }
}

#[tokio::test]
async fn typing_indicator_skips_the_typist() {
    let (addr, _store) = start_test_server().await;
    let mut alice = connect(addr, "alice").await;
    let mut bob = connect(addr, "bob").await;

    for (ws, user) in [(&mut alice, "alice"), (&mut bob, "bob")] {
        send_frame(
            ws,
            serde_json::json!({
                "event": "join_group",
                "data": {"groupId": "g1", "userId": user}
            }),
        )
        .await;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    send_frame(
        &mut alice,
        serde_json::json!({
            "event": "typing",
            "data": {"to": "g1", "typing": true, "isGroup": true, "from": "alice"}
        }),
    )
    .await;

    let event = recv_event(&mut bob).await;
    assert_eq!(event.get("event").and_then(|v| v.as_str()), Some("user_typing"));
    assert_eq!(
        event
            .get("data")
            .and_then(|d| d.get("typing"))
            .and_then(|v| v.as_bool()),
        Some(true)
    );
    assert_silent(&mut alice).await;
}

#[tokio::test]
async fn malformed_frame_reports_validation_error_and_session_survives() {
    let (addr, _store) = start_test_server().await;
    let mut alice = connect(addr, "alice").await;

    send_frame(&mut alice, serde_json::json!({"event": "shout", "data": {}})).await;
    let error = recv_event(&mut alice).await;
    assert_eq!(error.get("event").and_then(|v| v.as_str()), Some("error"));
    assert_eq!(
        error
            .get("data")
            .and_then(|d| d.get("code"))
            .and_then(|v| v.as_u64()),
        Some(1001)
    );

    // The connection keeps working afterwards.
    send_frame(
        &mut alice,
        serde_json::json!({
            "event": "send_private_message",
            "data": {"from": "alice", "to": "alice", "content": "still here"}
        }),
    )
    .await;
    let event = recv_event(&mut alice).await;
    assert_eq!(event.get("event").and_then(|v| v.as_str()), Some("private_message"));
}

#[tokio::test]
async fn upgrade_without_user_id_is_rejected() {
    let (addr, _store) = start_test_server().await;
    let result = tokio_tungstenite::connect_async(format!("ws://{addr}/ws")).await;
    assert!(result.is_err(), "upgrade must be rejected before completing");
}

#[tokio::test]
async fn rest_overview_and_health() {
    let (addr, store) = start_test_server().await;
    store
        .insert_user(UserProfile {
            id: UserId::new("alice"),
            user_name: Some("Alice".to_string()),
            avatar: None,
        })
        .await;
    store
        .insert_user(UserProfile {
            id: UserId::new("bob"),
            user_name: Some("Bob".to_string()),
            avatar: None,
        })
        .await;

    let mut alice = connect(addr, "alice").await;
    let mut bob = connect(addr, "bob").await;
    send_frame(
        &mut alice,
        serde_json::json!({
            "event": "send_private_message",
            "data": {"from": "alice", "to": "bob", "content": "hello"}
        }),
    )
    .await;
    let _ = recv_event(&mut alice).await;
    let _ = recv_event(&mut bob).await;

    let response = reqwest::get(format!("http://{addr}/api/v1/chats?userId=alice")).await;
    let Ok(response) = response else {
        panic!("overview request failed");
    };
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = match response.json().await {
        Ok(body) => body,
        Err(e) => panic!("overview body is not JSON: {e}"),
    };
    let entries = body
        .get("chats")
        .and_then(|c| c.get("Bob"))
        .and_then(|v| v.as_array());
    let Some(entries) = entries else {
        panic!("expected a conversation keyed by Bob's display name");
    };
    assert_eq!(
        entries
            .first()
            .and_then(|e| e.get("from"))
            .and_then(|v| v.as_str()),
        Some("Alice")
    );

    let health = reqwest::get(format!("http://{addr}/health")).await;
    let Ok(health) = health else {
        panic!("health request failed");
    };
    assert_eq!(health.status(), 200);

    let unknown = reqwest::get(format!("http://{addr}/api/v1/chats?userId=ghost")).await;
    let Ok(unknown) = unknown else {
        panic!("overview request failed");
    };
    assert_eq!(unknown.status(), 404);
}
