//! GET /api/messages/users - the chat roster.

use actix_web::{get, web, HttpRequest, HttpResponse};
use log::error;
use palaver_chat::ChatService;
use serde_json::json;
use std::sync::Arc;

use super::current_user;

/// All known users except the caller, each with the last message of the
/// conversation and the caller's unread count for it.
#[get("/users")]
pub async fn get_users(
    req: HttpRequest,
    chat: web::Data<Arc<ChatService>>,
) -> Result<HttpResponse, actix_web::Error> {
    let user = current_user(&req)?;

    match chat.roster(&user.username).await {
        Ok(entries) => Ok(HttpResponse::Ok().json(entries)),
        Err(e) => {
            error!("Roster failed for {}: {}", user.username, e);
            Ok(HttpResponse::InternalServerError().json(json!({
                "error": "ROSTER_FAILED",
                "message": "Could not assemble the chat roster",
            })))
        }
    }
}
