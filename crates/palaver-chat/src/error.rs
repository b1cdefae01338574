//! Error types for the chat domain.

use thiserror::Error;

/// Errors from chat operations.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Directory error: {0}")]
    Directory(String),
}

/// Result alias for chat operations.
pub type ChatResult<T> = Result<T, ChatError>;

impl From<palaver_auth::AuthError> for ChatError {
    fn from(err: palaver_auth::AuthError) -> Self {
        match err {
            palaver_auth::AuthError::UserNotFound(msg) => ChatError::UserNotFound(msg),
            other => ChatError::Directory(other.to_string()),
        }
    }
}
