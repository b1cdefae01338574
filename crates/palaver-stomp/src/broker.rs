//! Subscription registry and frame delivery.
//!
//! Each session registers an outbound channel when its WebSocket task
//! starts; subscriptions accumulate per session and die with it. Delivery
//! never blocks: frames are pushed onto unbounded per-session channels and
//! written to the socket by the session's own task.

use crate::frame::Frame;
use dashmap::DashMap;
use log::debug;
use palaver_commons::{SessionId, SubscriptionId, UserName};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// One active subscription of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub destination: String,
}

impl Subscription {
    pub fn new(id: SubscriptionId, destination: impl Into<String>) -> Self {
        Self {
            id,
            destination: destination.into(),
        }
    }
}

/// Routes MESSAGE frames to live subscribers.
///
/// All maps are DashMaps so independent sessions never contend. The user
/// index backs user-addressed destinations (`/user/queue/...`), the chat
/// equivalent of sending to a named principal rather than a broadcast topic.
pub struct MessageBroker {
    senders: DashMap<SessionId, mpsc::UnboundedSender<Frame>>,
    subscriptions: DashMap<SessionId, Vec<Subscription>>,
    session_users: DashMap<SessionId, UserName>,
    user_sessions: DashMap<UserName, Vec<SessionId>>,
    next_message_id: AtomicU64,
}

impl MessageBroker {
    pub fn new() -> Self {
        Self {
            senders: DashMap::new(),
            subscriptions: DashMap::new(),
            session_users: DashMap::new(),
            user_sessions: DashMap::new(),
            next_message_id: AtomicU64::new(1),
        }
    }

    /// Register a session's outbound channel. Called when the WebSocket task
    /// starts, before any frame is processed.
    pub fn register(&self, session_id: SessionId) -> mpsc::UnboundedReceiver<Frame> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.insert(session_id, tx);
        rx
    }

    /// Bind a session to a username once its open frame authenticates, so
    /// user-addressed publishes can find it.
    pub fn bind_user(&self, session_id: &SessionId, username: &UserName) {
        self.session_users.insert(session_id.clone(), username.clone());
        let mut sessions = self.user_sessions.entry(username.clone()).or_default();
        if !sessions.contains(session_id) {
            sessions.push(session_id.clone());
        }
    }

    /// Drop all broker state for a session. Called when the WebSocket task
    /// ends, however it ends.
    pub fn unregister(&self, session_id: &SessionId) {
        self.senders.remove(session_id);
        self.subscriptions.remove(session_id);
        if let Some((_, username)) = self.session_users.remove(session_id) {
            let now_empty = match self.user_sessions.get_mut(&username) {
                Some(mut sessions) => {
                    sessions.retain(|s| s != session_id);
                    sessions.is_empty()
                }
                None => false,
            };
            if now_empty {
                self.user_sessions.remove_if(&username, |_, sessions| sessions.is_empty());
            }
        }
        debug!("Broker state dropped for session {}", session_id);
    }

    /// Add (or replace, by id) a subscription for a session.
    pub fn subscribe(&self, session_id: &SessionId, subscription: Subscription) {
        let mut subs = self.subscriptions.entry(session_id.clone()).or_default();
        subs.retain(|s| s.id != subscription.id);
        debug!(
            "Session {} subscribed {} -> {}",
            session_id, subscription.id, subscription.destination
        );
        subs.push(subscription);
    }

    /// Remove a subscription by id. No-op when absent.
    pub fn unsubscribe(&self, session_id: &SessionId, subscription_id: &SubscriptionId) {
        if let Some(mut subs) = self.subscriptions.get_mut(session_id) {
            subs.retain(|s| &s.id != subscription_id);
        }
    }

    /// Fan a payload out to every subscriber of `destination`.
    ///
    /// Returns the number of sessions the frame was handed to.
    pub fn publish(&self, destination: &str, content_type: &str, body: &str) -> usize {
        let mut delivered = 0;
        for entry in self.subscriptions.iter() {
            let session_id = entry.key();
            for sub in entry.value().iter().filter(|s| s.destination == destination) {
                if self.deliver(session_id, &sub.id, destination, content_type, body) {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    /// Deliver a payload to every session of `username` subscribed to the
    /// user-addressed `destination` (e.g. `/user/queue/messages`).
    pub fn publish_to_user(
        &self,
        username: &UserName,
        destination: &str,
        content_type: &str,
        body: &str,
    ) -> usize {
        let sessions: Vec<SessionId> = match self.user_sessions.get(username) {
            Some(sessions) => sessions.clone(),
            None => return 0,
        };

        let mut delivered = 0;
        for session_id in &sessions {
            let subs: Vec<SubscriptionId> = match self.subscriptions.get(session_id) {
                Some(subs) => subs
                    .iter()
                    .filter(|s| s.destination == destination)
                    .map(|s| s.id.clone())
                    .collect(),
                None => continue,
            };
            for sub_id in subs {
                if self.deliver(session_id, &sub_id, destination, content_type, body) {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    fn deliver(
        &self,
        session_id: &SessionId,
        subscription_id: &SubscriptionId,
        destination: &str,
        content_type: &str,
        body: &str,
    ) -> bool {
        let message_id = format!("m-{}", self.next_message_id.fetch_add(1, Ordering::Relaxed));
        match self.senders.get(session_id) {
            Some(sender) => {
                let frame =
                    Frame::message(destination, subscription_id, &message_id, content_type, body);
                sender.send(frame).is_ok()
            }
            None => false,
        }
    }

    /// Number of sessions currently registered.
    pub fn session_count(&self) -> usize {
        self.senders.len()
    }
}

impl Default for MessageBroker {
    fn default() -> Self {
        Self::new()
    }
}
