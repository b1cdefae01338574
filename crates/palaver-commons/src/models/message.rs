//! Chat message models and wire-facing views.

use crate::models::{MessageId, UserName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored chat message between two users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender: UserName,
    pub receiver: UserName,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    pub read: bool,
}

/// Client-facing view of a chat message.
///
/// Serialized to JSON both on the REST API and inside MESSAGE frame bodies,
/// so both surfaces show the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: MessageId,
    pub sender: UserName,
    pub sender_name: String,
    pub receiver: UserName,
    pub receiver_name: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    pub read: bool,
}

/// One row of the chat roster: a peer plus conversation summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub username: UserName,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<MessageView>,
    pub unread: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_view_uses_camel_case() {
        let view = MessageView {
            id: MessageId::new(7),
            sender: UserName::new("alice"),
            sender_name: "Alice".to_string(),
            receiver: UserName::new("bob"),
            receiver_name: "Bob".to_string(),
            content: "hi".to_string(),
            sent_at: Utc::now(),
            read: false,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("senderName").is_some());
        assert!(json.get("sentAt").is_some());
        assert!(json.get("sender_name").is_none());
    }
}
