//! In-memory message store.
//!
//! Holds the append-ordered message log the REST handlers and the roster
//! query need. Durable message storage is an external collaborator of this
//! service; this store keeps the working set for the running process.

use chrono::Utc;
use palaver_commons::{ChatMessage, MessageId, UserName};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Append-ordered store of chat messages.
pub struct MessageStore {
    messages: RwLock<Vec<ChatMessage>>,
    next_id: AtomicU64,
}

impl MessageStore {
    pub fn new() -> Self {
        Self {
            messages: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Append a new unread message and return the stored record.
    pub fn append(&self, sender: &UserName, receiver: &UserName, content: &str) -> ChatMessage {
        let message = ChatMessage {
            id: MessageId::new(self.next_id.fetch_add(1, Ordering::Relaxed)),
            sender: sender.clone(),
            receiver: receiver.clone(),
            content: content.to_string(),
            sent_at: Utc::now(),
            read: false,
        };
        self.messages.write().push(message.clone());
        message
    }

    /// All messages between two users, both directions, oldest first.
    pub fn conversation(&self, a: &UserName, b: &UserName) -> Vec<ChatMessage> {
        self.messages
            .read()
            .iter()
            .filter(|m| Self::is_between(m, a, b))
            .cloned()
            .collect()
    }

    /// Most recent message between two users, if any.
    pub fn last_message(&self, a: &UserName, b: &UserName) -> Option<ChatMessage> {
        self.messages
            .read()
            .iter()
            .rev()
            .find(|m| Self::is_between(m, a, b))
            .cloned()
    }

    /// Unread messages addressed to `receiver`, any sender.
    pub fn unread_count(&self, receiver: &UserName) -> u64 {
        self.messages
            .read()
            .iter()
            .filter(|m| &m.receiver == receiver && !m.read)
            .count() as u64
    }

    /// Unread messages from `sender` addressed to `receiver`.
    pub fn unread_between(&self, sender: &UserName, receiver: &UserName) -> u64 {
        self.messages
            .read()
            .iter()
            .filter(|m| &m.sender == sender && &m.receiver == receiver && !m.read)
            .count() as u64
    }

    /// Mark everything `sender` sent to `receiver` as read.
    ///
    /// Returns the number of messages flipped.
    pub fn mark_read(&self, sender: &UserName, receiver: &UserName) -> usize {
        let mut messages = self.messages.write();
        let mut flipped = 0;
        for m in messages.iter_mut() {
            if &m.sender == sender && &m.receiver == receiver && !m.read {
                m.read = true;
                flipped += 1;
            }
        }
        flipped
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }

    fn is_between(m: &ChatMessage, a: &UserName, b: &UserName) -> bool {
        (&m.sender == a && &m.receiver == b) || (&m.sender == b && &m.receiver == a)
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}
