//! GET /api/messages/unread-count

use actix_web::{get, web, HttpRequest, HttpResponse};
use palaver_chat::ChatService;
use std::sync::Arc;

use super::current_user;

/// Total unread messages addressed to the caller.
#[get("/unread-count")]
pub async fn unread_count(
    req: HttpRequest,
    chat: web::Data<Arc<ChatService>>,
) -> Result<HttpResponse, actix_web::Error> {
    let user = current_user(&req)?;
    Ok(HttpResponse::Ok().json(chat.unread_count(&user.username)))
}
