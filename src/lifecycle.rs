//! Server lifecycle management helpers.
//!
//! Encapsulates the heavy lifting otherwise crowding `main.rs`: building
//! the shared components, wiring the HTTP server, and running it until a
//! termination signal arrives.

use crate::config::ServerConfig;
use crate::{middleware, routes};
use actix_web::{App, HttpServer};
use anyhow::Result;
use log::info;
use palaver_api::handlers::ws::WsSettings;
use palaver_auth::{CredentialVerifier, InMemoryUserDirectory, JwtVerifier, UserDirectory};
use palaver_chat::{ChatService, MessageStore};
use palaver_commons::{UserId, UserName, UserRecord};
use palaver_session::SessionRegistry;
use palaver_stomp::{Access, DestinationPolicy, FrameInterceptor, MessageBroker};
use std::sync::Arc;

/// Aggregated application components shared across the HTTP server workers.
#[derive(Clone)]
pub struct ApplicationComponents {
    pub verifier: Arc<dyn CredentialVerifier>,
    pub directory: Arc<dyn UserDirectory>,
    pub session_registry: Arc<SessionRegistry>,
    pub interceptor: Arc<FrameInterceptor>,
    pub policy: Arc<DestinationPolicy>,
    pub broker: Arc<MessageBroker>,
    pub message_store: Arc<MessageStore>,
    pub chat_service: Arc<ChatService>,
    pub ws_settings: WsSettings,
}

/// Build verifier, directory, session registry, interceptor, policy, broker,
/// and the chat service. Everything is constructed here and injected; no
/// component reaches for globals.
pub fn bootstrap(config: &ServerConfig) -> Result<ApplicationComponents> {
    let verifier: Arc<dyn CredentialVerifier> = Arc::new(
        JwtVerifier::new(config.auth.jwt_secret.clone(), config.auth.issuer_list())
            .with_token_expiry_hours(config.auth.token_expiry_hours),
    );

    let directory = Arc::new(InMemoryUserDirectory::new());
    for seed in &config.users {
        let mut record = UserRecord::new(
            UserId::new(format!("u_{}", seed.username)),
            UserName::new(seed.username.clone()),
            seed.display_name.clone(),
            seed.role,
        );
        if let Some(email) = &seed.email {
            record = record.with_email(email.clone());
        }
        if let Some(url) = &seed.image_url {
            record = record.with_image_url(url.clone());
        }
        directory.insert(record);
    }
    info!("User directory seeded with {} users", directory.len());
    let directory: Arc<dyn UserDirectory> = directory;

    let session_registry = Arc::new(SessionRegistry::new());

    let interceptor = Arc::new(FrameInterceptor::new(
        session_registry.clone(),
        verifier.clone(),
        directory.clone(),
    ));

    // Destination rule table; evaluated in declared order, closed with an
    // implicit deny-all.
    let policy = Arc::new(
        DestinationPolicy::builder()
            .send("/app/**", Access::Authenticated)
            .subscribe("/topic/**", Access::Authenticated)
            .subscribe("/user/queue/**", Access::Authenticated)
            .build(),
    );

    let broker = Arc::new(MessageBroker::new());
    let message_store = Arc::new(MessageStore::new());
    let chat_service = Arc::new(ChatService::new(
        directory.clone(),
        message_store.clone(),
        broker.clone(),
    ));

    Ok(ApplicationComponents {
        verifier,
        directory,
        session_registry,
        interceptor,
        policy,
        broker,
        message_store,
        chat_service,
        ws_settings: WsSettings {
            max_message_size: config.security.max_ws_message_size,
        },
    })
}

/// Run the HTTP server until a termination signal is received.
pub async fn run(config: &ServerConfig, components: ApplicationComponents) -> Result<()> {
    let bind_addr = (config.server.host.clone(), config.server.port);
    let workers = config.server.workers;
    let cors_config = config.clone();

    info!(
        "Listening on {}:{} ({} workers)",
        config.server.host, config.server.port, workers
    );

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::request_logger())
            .wrap(middleware::build_cors_from_config(&cors_config))
            .configure(|cfg| routes::configure(cfg, &components))
    })
    .workers(workers)
    .bind(bind_addr)?
    .run()
    .await?;

    info!("Server stopped");
    Ok(())
}
