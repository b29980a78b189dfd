//! WebSocket layer: session handling, event parsing, dispatch.
//!
//! The WebSocket endpoint at `/ws` is the live socket channel: clients
//! connect with an asserted `userId`, emit domain events, and receive
//! routed messages, history replies, deletions, and typing indicators.

pub mod connection;
pub mod handler;
pub mod messages;
