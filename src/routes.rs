//! Route configuration.

use crate::lifecycle::ApplicationComponents;
use actix_web::{get, web, HttpResponse, Responder};
use palaver_api::handlers::{messages, ws};
use palaver_api::middleware::AuthMiddleware;
use serde_json::json;

/// Liveness probe.
#[get("/healthz")]
async fn healthz() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// Register all routes and shared state on the application.
pub fn configure(cfg: &mut web::ServiceConfig, components: &ApplicationComponents) {
    cfg.app_data(web::Data::new(components.verifier.clone()))
        .app_data(web::Data::new(components.directory.clone()))
        .app_data(web::Data::new(components.interceptor.clone()))
        .app_data(web::Data::new(components.policy.clone()))
        .app_data(web::Data::new(components.broker.clone()))
        .app_data(web::Data::new(components.chat_service.clone()))
        .app_data(web::Data::new(components.ws_settings.clone()))
        .service(healthz)
        .service(ws::websocket_handler)
        .service(
            web::scope("/api/messages")
                .wrap(AuthMiddleware::new(
                    components.verifier.clone(),
                    components.directory.clone(),
                ))
                .service(messages::roster::get_users)
                .service(messages::conversation::get_conversation)
                .service(messages::mark_read::mark_read)
                .service(messages::unread_count::unread_count),
        );
}
