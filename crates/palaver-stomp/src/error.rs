//! Error types for frame processing.

use thiserror::Error;

/// Failures raised while parsing, authenticating, authorizing, or
/// dispatching a frame.
///
/// The `Display` strings are what remote peers see in ERROR frames; they
/// carry the failure category only, never verifier or directory internals.
#[derive(Error, Debug)]
pub enum FrameError {
    /// Malformed wire data.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Open-frame authentication failed (missing header, bad token, unknown
    /// user). Deliberately a single uniform reason.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// No identity could be resolved for a mid-session frame.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Identity was resolved but the destination policy denies the frame.
    #[error("access denied: {destination}")]
    AccessDenied { destination: String },

    /// Frame body could not be interpreted by the business handler.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Business handler failed to process an otherwise valid frame.
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Result alias for frame processing.
pub type FrameResult<T> = Result<T, FrameError>;
