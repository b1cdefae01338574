//! Chat service: save-and-deliver, conversations, roster.

use crate::error::{ChatError, ChatResult};
use crate::store::MessageStore;
use log::{debug, warn};
use palaver_commons::{ChatMessage, MessageView, RosterEntry, UserName, UserRecord};
use palaver_auth::UserDirectory;
use palaver_stomp::MessageBroker;
use std::sync::Arc;

/// User-addressed destination chat messages are delivered on.
pub const USER_QUEUE_MESSAGES: &str = "/user/queue/messages";

const CONTENT_TYPE_JSON: &str = "application/json";

/// Chat operations shared by the frame dispatcher and the REST handlers.
pub struct ChatService {
    directory: Arc<dyn UserDirectory>,
    store: Arc<MessageStore>,
    broker: Arc<MessageBroker>,
}

impl ChatService {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        store: Arc<MessageStore>,
        broker: Arc<MessageBroker>,
    ) -> Self {
        Self {
            directory,
            store,
            broker,
        }
    }

    /// Save a message and deliver it to both parties' user queues.
    ///
    /// The receiver gets the message; the sender gets an echo so every open
    /// client of theirs renders the conversation consistently.
    pub async fn send_message(
        &self,
        sender: &UserName,
        receiver: &UserName,
        content: &str,
    ) -> ChatResult<MessageView> {
        if content.trim().is_empty() {
            return Err(ChatError::InvalidMessage("empty content".to_string()));
        }

        let sender_record = self.directory.get_user_by_username(sender).await?;
        let receiver_record = self.directory.get_user_by_username(receiver).await?;

        let saved = self.store.append(sender, receiver, content);
        let view = Self::to_view(&saved, &sender_record, &receiver_record);

        let body = serde_json::to_string(&view)
            .map_err(|e| ChatError::InvalidMessage(format!("serialization: {}", e)))?;

        let to_receiver =
            self.broker
                .publish_to_user(receiver, USER_QUEUE_MESSAGES, CONTENT_TYPE_JSON, &body);
        let to_sender =
            self.broker
                .publish_to_user(sender, USER_QUEUE_MESSAGES, CONTENT_TYPE_JSON, &body);

        if to_receiver == 0 {
            // Receiver offline: the message stays unread in the store.
            debug!("Message {} stored; {} has no live session", saved.id, receiver);
        }
        debug!(
            "Message {} delivered: receiver_sessions={} sender_sessions={}",
            saved.id, to_receiver, to_sender
        );

        Ok(view)
    }

    /// Full conversation between the caller and a peer, oldest first.
    pub async fn conversation(
        &self,
        me: &UserName,
        peer: &UserName,
    ) -> ChatResult<Vec<MessageView>> {
        let my_record = self.directory.get_user_by_username(me).await?;
        let peer_record = self.directory.get_user_by_username(peer).await?;

        let views = self
            .store
            .conversation(me, peer)
            .iter()
            .map(|m| {
                if m.sender == *me {
                    Self::to_view(m, &my_record, &peer_record)
                } else {
                    Self::to_view(m, &peer_record, &my_record)
                }
            })
            .collect();
        Ok(views)
    }

    /// Mark everything `peer` sent to `me` as read.
    pub fn mark_read(&self, peer: &UserName, me: &UserName) -> usize {
        self.store.mark_read(peer, me)
    }

    /// Unread total for the caller.
    pub fn unread_count(&self, me: &UserName) -> u64 {
        self.store.unread_count(me)
    }

    /// Chat roster: every known user except the caller, with the last
    /// message of the conversation and the caller's unread count for it.
    pub async fn roster(&self, me: &UserName) -> ChatResult<Vec<RosterEntry>> {
        let my_record = self.directory.get_user_by_username(me).await?;
        let users = self.directory.all_users().await.map_err(|e| {
            warn!("Roster directory scan failed: {}", e);
            ChatError::Directory(e.to_string())
        })?;

        let entries = users
            .into_iter()
            .filter(|u| u.username != *me)
            .map(|peer| {
                let last_message = self.store.last_message(me, &peer.username).map(|m| {
                    if m.sender == *me {
                        Self::to_view(&m, &my_record, &peer)
                    } else {
                        Self::to_view(&m, &peer, &my_record)
                    }
                });
                RosterEntry {
                    username: peer.username.clone(),
                    display_name: peer.display_name.clone(),
                    email: peer.email.clone(),
                    image_url: peer.image_url.clone(),
                    unread: self.store.unread_between(&peer.username, me),
                    last_message,
                }
            })
            .collect();
        Ok(entries)
    }

    fn to_view(m: &ChatMessage, sender: &UserRecord, receiver: &UserRecord) -> MessageView {
        MessageView {
            id: m.id,
            sender: m.sender.clone(),
            sender_name: sender.display_name.clone(),
            receiver: m.receiver.clone(),
            receiver_name: receiver.display_name.clone(),
            content: m.content.clone(),
            sent_at: m.sent_at,
            read: m.read,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palaver_auth::InMemoryUserDirectory;
    use palaver_commons::{Role, SessionId, SubscriptionId, UserId};
    use palaver_stomp::{headers, Subscription};

    fn directory() -> Arc<InMemoryUserDirectory> {
        let dir = InMemoryUserDirectory::new();
        for name in ["alice", "bob", "carol"] {
            dir.insert(UserRecord::new(
                UserId::new(format!("u_{}", name)),
                UserName::new(name),
                name.to_uppercase(),
                Role::User,
            ));
        }
        Arc::new(dir)
    }

    fn service() -> (ChatService, Arc<MessageBroker>) {
        let broker = Arc::new(MessageBroker::new());
        let service = ChatService::new(
            directory(),
            Arc::new(MessageStore::new()),
            broker.clone(),
        );
        (service, broker)
    }

    #[tokio::test]
    async fn send_message_delivers_to_both_parties() {
        let (service, broker) = service();

        let alice_session = SessionId::new("s-alice");
        let bob_session = SessionId::new("s-bob");
        let mut alice_rx = broker.register(alice_session.clone());
        let mut bob_rx = broker.register(bob_session.clone());
        broker.bind_user(&alice_session, &UserName::new("alice"));
        broker.bind_user(&bob_session, &UserName::new("bob"));
        for (session, sub) in [(&alice_session, "a"), (&bob_session, "b")] {
            broker.subscribe(
                session,
                Subscription::new(SubscriptionId::new(sub), USER_QUEUE_MESSAGES),
            );
        }

        let view = service
            .send_message(&UserName::new("alice"), &UserName::new("bob"), "hello")
            .await
            .unwrap();
        assert_eq!(view.sender_name, "ALICE");
        assert!(!view.read);

        let frame = bob_rx.try_recv().unwrap();
        assert_eq!(frame.header(headers::DESTINATION), Some(USER_QUEUE_MESSAGES));
        let delivered: MessageView = serde_json::from_str(&frame.body).unwrap();
        assert_eq!(delivered.content, "hello");

        // Sender echo
        assert!(alice_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn send_message_rejects_unknown_receiver_and_empty_content() {
        let (service, _broker) = service();

        let result = service
            .send_message(&UserName::new("alice"), &UserName::new("nobody"), "hi")
            .await;
        assert!(matches!(result, Err(ChatError::UserNotFound(_))));

        let result = service
            .send_message(&UserName::new("alice"), &UserName::new("bob"), "   ")
            .await;
        assert!(matches!(result, Err(ChatError::InvalidMessage(_))));
    }

    #[tokio::test]
    async fn roster_excludes_self_and_tracks_unread() {
        let (service, _broker) = service();
        let alice = UserName::new("alice");
        let bob = UserName::new("bob");

        service.send_message(&bob, &alice, "ping").await.unwrap();
        service.send_message(&bob, &alice, "ping again").await.unwrap();

        let roster = service.roster(&alice).await.unwrap();
        let names: Vec<&str> = roster.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(names, vec!["bob", "carol"]);

        let bob_entry = roster.iter().find(|e| e.username.as_str() == "bob").unwrap();
        assert_eq!(bob_entry.unread, 2);
        assert_eq!(bob_entry.last_message.as_ref().unwrap().content, "ping again");

        let carol_entry = roster.iter().find(|e| e.username.as_str() == "carol").unwrap();
        assert_eq!(carol_entry.unread, 0);
        assert!(carol_entry.last_message.is_none());

        service.mark_read(&bob, &alice);
        let roster = service.roster(&alice).await.unwrap();
        assert_eq!(roster.iter().find(|e| e.username.as_str() == "bob").unwrap().unread, 0);
    }

    #[tokio::test]
    async fn conversation_views_name_both_sides() {
        let (service, _broker) = service();
        let alice = UserName::new("alice");
        let bob = UserName::new("bob");

        service.send_message(&alice, &bob, "hi bob").await.unwrap();
        service.send_message(&bob, &alice, "hi alice").await.unwrap();

        let conv = service.conversation(&alice, &bob).await.unwrap();
        assert_eq!(conv.len(), 2);
        assert_eq!(conv[0].sender_name, "ALICE");
        assert_eq!(conv[1].sender_name, "BOB");
    }
}
