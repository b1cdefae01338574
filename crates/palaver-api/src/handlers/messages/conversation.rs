//! GET /api/messages/conversation/{username}

use actix_web::{get, web, HttpRequest, HttpResponse};
use log::error;
use palaver_chat::{ChatError, ChatService};
use palaver_commons::UserName;
use serde_json::json;
use std::sync::Arc;

use super::current_user;

/// Full conversation between the caller and a peer, oldest first.
#[get("/conversation/{username}")]
pub async fn get_conversation(
    req: HttpRequest,
    path: web::Path<String>,
    chat: web::Data<Arc<ChatService>>,
) -> Result<HttpResponse, actix_web::Error> {
    let user = current_user(&req)?;
    let peer = UserName::new(path.into_inner());

    match chat.conversation(&user.username, &peer).await {
        Ok(messages) => Ok(HttpResponse::Ok().json(messages)),
        Err(ChatError::UserNotFound(_)) => Ok(HttpResponse::NotFound().json(json!({
            "error": "USER_NOT_FOUND",
            "message": format!("No user '{}'", peer),
        }))),
        Err(e) => {
            error!("Conversation {} <-> {} failed: {}", user.username, peer, e);
            Ok(HttpResponse::InternalServerError().json(json!({
                "error": "CONVERSATION_FAILED",
                "message": "Could not load the conversation",
            })))
        }
    }
}
