//! Service layer: chat orchestration and fan-out.
//!
//! [`ChatService`] coordinates message persistence, enrichment, and
//! delivery; [`FanoutEngine`] resolves target identities to live
//! connections and dispatches events to them.

pub mod chat_service;
pub mod fanout;

pub use chat_service::{ChatService, ConversationEntry};
pub use fanout::FanoutEngine;
