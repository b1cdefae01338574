// Palaver shared types
// Typed identifiers and domain models used across the workspace.

pub mod models;

pub use models::{
    ChatMessage, ConnectionInfo, MessageId, MessageView, Role, RosterEntry, SessionId,
    SubscriptionId, UserId, UserName, UserRecord,
};
