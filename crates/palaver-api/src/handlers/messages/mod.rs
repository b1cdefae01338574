//! REST messaging endpoints.
//!
//! All endpoints live under `/api/messages` behind the bearer middleware;
//! the authenticated identity is read back from request extensions.

pub mod conversation;
pub mod mark_read;
pub mod roster;
pub mod unread_count;

use actix_web::{error::ErrorUnauthorized, HttpMessage, HttpRequest};
use palaver_auth::AuthenticatedUser;

/// Identity attached by the auth middleware.
///
/// Absence means the endpoint was mounted outside the middleware; treat it
/// as unauthorized rather than panicking.
pub(crate) fn current_user(req: &HttpRequest) -> Result<AuthenticatedUser, actix_web::Error> {
    req.extensions()
        .get::<AuthenticatedUser>()
        .cloned()
        .ok_or_else(|| ErrorUnauthorized("not authenticated"))
}
