//! POST /api/messages/mark-read/{username}

use actix_web::{post, web, HttpRequest, HttpResponse};
use log::debug;
use palaver_chat::ChatService;
use palaver_commons::UserName;
use std::sync::Arc;

use super::current_user;

/// Mark everything the peer sent to the caller as read.
#[post("/mark-read/{username}")]
pub async fn mark_read(
    req: HttpRequest,
    path: web::Path<String>,
    chat: web::Data<Arc<ChatService>>,
) -> Result<HttpResponse, actix_web::Error> {
    let user = current_user(&req)?;
    let peer = UserName::new(path.into_inner());

    let flipped = chat.mark_read(&peer, &user.username);
    debug!("{} marked {} messages from {} read", user.username, flipped, peer);

    Ok(HttpResponse::Ok().finish())
}
