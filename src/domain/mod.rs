//! Domain layer: identities, message records, live state, and events.
//!
//! This module contains the relay's core model: typed identifiers, the
//! message record with its enrichment views, the connection registry and
//! live group membership table, and the server→client event type.

pub mod event;
pub mod ids;
pub mod membership;
pub mod message;
pub mod registry;

pub use event::ChatEvent;
pub use ids::{ConnectionId, GroupId, MessageId, UserId};
pub use membership::GroupMembership;
pub use message::{
    EnrichedMessage, GroupRecord, MessageRecord, MessageStatus, NewMessage, RecipientKind,
    ReferencedMessage, UserProfile,
};
pub use registry::{ConnectionHandle, ConnectionRegistry};
