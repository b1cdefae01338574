//! Authentication error taxonomy.
//!
//! Every failure kind is a distinct variant so callers can branch without
//! string matching. None of these messages are forwarded verbatim to remote
//! peers; entry points log them and answer with a uniform reason.

use thiserror::Error;

/// Errors produced by credential verification and directory lookups.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authorization is missing")]
    MissingAuthorization,

    #[error("Malformed authorization: {0}")]
    MalformedAuthorization(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Untrusted token issuer: {0}")]
    UntrustedIssuer(String),

    #[error("Missing required claim: {0}")]
    MissingClaim(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Directory error: {0}")]
    DirectoryError(String),

    #[error("Token encoding error: {0}")]
    EncodingError(String),
}

/// Result alias for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;
