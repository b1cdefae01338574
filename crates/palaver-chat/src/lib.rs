//! # palaver-chat
//!
//! The chat domain: message storage, conversation queries, and the service
//! that saves a message and delivers it to both parties' user queues.

pub mod error;
pub mod service;
pub mod store;

pub use error::{ChatError, ChatResult};
pub use service::{ChatService, USER_QUEUE_MESSAGES};
pub use store::MessageStore;
