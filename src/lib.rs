//! # parley-gateway
//!
//! REST API and WebSocket gateway for real-time private and group chat
//! relay.
//!
//! Clients hold a persistent WebSocket connection through which private
//! and group messages are routed between currently-connected
//! participants; message history is persisted, and ephemeral typing
//! indicators and soft-deletion events are broadcast to live sessions.
//! User and group records are owned by external collaborators — this
//! service is a routing layer.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── Session Handler (ws/)
//!     │
//!     ├── ChatService + FanoutEngine (service/)
//!     │
//!     ├── ConnectionRegistry (domain/)
//!     ├── GroupMembership (domain/)
//!     │
//!     └── MessageStore / Directory (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;
