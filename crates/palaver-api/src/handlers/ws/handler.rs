//! WebSocket session loop.
//!
//! Each admitted connection gets one task running a `tokio::select!` loop:
//! inbound text frames are parsed as STOMP, authenticated by the frame
//! interceptor, authorized against the destination policy, and dispatched;
//! outbound frames queued by the broker are drained onto the socket.
//!
//! Open-frame authentication failures close the socket; every other frame
//! failure answers with an ERROR frame and terminates only that frame.

use actix_web::{get, web, Error, HttpRequest, HttpResponse};
use actix_ws::{CloseCode, CloseReason, Message, Session};
use futures_util::StreamExt;
use log::{debug, error, info, warn};
use palaver_auth::{CredentialVerifier, UserDirectory};
use palaver_chat::{ChatError, ChatService};
use palaver_commons::{ConnectionInfo, SessionId, SubscriptionId, UserName};
use palaver_stomp::{
    headers, Command, ConnectionAttributes, DestinationPolicy, Frame, FrameContext, FrameDirection,
    FrameError, FrameInterceptor, MessageBroker, Subscription,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Tunables for the WebSocket endpoint.
#[derive(Debug, Clone)]
pub struct WsSettings {
    /// Maximum accepted size of one inbound text frame, in bytes.
    pub max_message_size: usize,
}

impl Default for WsSettings {
    fn default() -> Self {
        Self {
            max_message_size: 64 * 1024,
        }
    }
}

/// Body of a SEND to `/app/chat.send`.
#[derive(Debug, Deserialize)]
struct ChatSendPayload {
    receiver: UserName,
    content: String,
}

/// GET /ws - establish a messaging session.
///
/// The admission gate runs first: probe sub-paths are answered directly,
/// everything else needs a verifiable bearer token before the upgrade is
/// attempted. The session loop then authenticates frames independently.
#[get("/ws{tail:.*}")]
#[allow(clippy::too_many_arguments)]
pub async fn websocket_handler(
    req: HttpRequest,
    stream: web::Payload,
    verifier: web::Data<Arc<dyn CredentialVerifier>>,
    directory: web::Data<Arc<dyn UserDirectory>>,
    interceptor: web::Data<Arc<FrameInterceptor>>,
    policy: web::Data<Arc<DestinationPolicy>>,
    broker: web::Data<Arc<MessageBroker>>,
    chat: web::Data<Arc<ChatService>>,
    settings: web::Data<WsSettings>,
) -> Result<HttpResponse, Error> {
    let admission =
        match super::admission::authorize_handshake(&req, verifier.get_ref(), directory.get_ref())
            .await
        {
            Ok(admission) => admission,
            Err(e) => {
                warn!("Handshake rejected on {}: {}", req.path(), e);
                return Ok(HttpResponse::Unauthorized().json(json!({
                    "error": "UNAUTHORIZED",
                    "message": "Authentication required",
                })));
            }
        };

    let principal = match admission {
        super::admission::Admission::Probe => {
            return Ok(super::admission::probe_response(&req));
        }
        super::admission::Admission::Open { principal } => principal,
    };

    let session_id = SessionId::new(uuid::Uuid::new_v4().simple().to_string());
    let connection_info = ConnectionInfo::new(req.peer_addr().map(|addr| addr.to_string()));
    let attrs = ConnectionAttributes::new(principal, connection_info);

    let (response, session, msg_stream) = actix_ws::handle(&req, stream)?;

    let interceptor = interceptor.get_ref().clone();
    let policy = policy.get_ref().clone();
    let broker = broker.get_ref().clone();
    let chat = chat.get_ref().clone();
    let max_message_size = settings.max_message_size;

    actix_web::rt::spawn(async move {
        run_session(
            session_id,
            attrs,
            session,
            msg_stream,
            interceptor,
            policy,
            broker,
            chat,
            max_message_size,
        )
        .await;
    });

    Ok(response)
}

/// Outcome of processing one inbound text payload.
enum Flow {
    Continue,
    Close(Option<CloseReason>),
}

/// Main session loop.
#[allow(clippy::too_many_arguments)]
async fn run_session(
    session_id: SessionId,
    attrs: ConnectionAttributes,
    mut session: Session,
    mut msg_stream: actix_ws::MessageStream,
    interceptor: Arc<FrameInterceptor>,
    policy: Arc<DestinationPolicy>,
    broker: Arc<MessageBroker>,
    chat: Arc<ChatService>,
    max_message_size: usize,
) {
    let mut outbound = broker.register(session_id.clone());
    info!(
        "WebSocket session {} started (peer: {})",
        session_id,
        attrs.connection_info.remote_addr.as_deref().unwrap_or("unknown")
    );

    loop {
        tokio::select! {
            // Frames queued for this session by the broker
            frame = outbound.recv() => {
                match frame {
                    Some(frame) => {
                        if session.text(frame.to_wire()).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            // Inbound WebSocket messages
            msg = msg_stream.next() => {
                match msg {
                    Some(Ok(Message::Ping(bytes))) => {
                        if session.pong(&bytes).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Text(text))) => {
                        if text.len() > max_message_size {
                            warn!(
                                "Session {}: frame of {} bytes exceeds limit {}",
                                session_id, text.len(), max_message_size
                            );
                            let _ = send_frame(&mut session, &Frame::error("message too large")).await;
                            continue;
                        }

                        let flow = process_text(
                            &session_id,
                            &attrs,
                            &text,
                            &mut session,
                            &interceptor,
                            &policy,
                            &broker,
                            &chat,
                        )
                        .await;

                        if let Flow::Close(reason) = flow {
                            let _ = session.close(reason).await;
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        warn!("Session {}: binary frames not supported", session_id);
                        let _ = send_frame(&mut session, &Frame::error("binary frames not supported")).await;
                    }
                    Some(Ok(Message::Close(reason))) => {
                        debug!("Session {}: client closed ({:?})", session_id, reason);
                        let _ = session.close(reason).await;
                        break;
                    }
                    Some(Ok(_)) => {
                        // Continuation, Nop - ignore
                    }
                    Some(Err(e)) => {
                        error!("Session {}: websocket error: {}", session_id, e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    broker.unregister(&session_id);
    info!("WebSocket session {} ended", session_id);
}

/// Parse, authenticate, authorize, and dispatch one text payload.
#[allow(clippy::too_many_arguments)]
async fn process_text(
    session_id: &SessionId,
    attrs: &ConnectionAttributes,
    text: &str,
    session: &mut Session,
    interceptor: &Arc<FrameInterceptor>,
    policy: &Arc<DestinationPolicy>,
    broker: &Arc<MessageBroker>,
    chat: &Arc<ChatService>,
) -> Flow {
    let frame = match Frame::parse(text) {
        Ok(frame) => frame,
        Err(e) => {
            debug!("Session {}: {}", session_id, e);
            let _ = send_frame(session, &Frame::error(&e.to_string())).await;
            return Flow::Continue;
        }
    };

    let mut ctx = FrameContext::new(session_id.clone());
    if let Err(e) = interceptor.intercept(&mut ctx, &frame, attrs).await {
        let _ = send_frame(session, &Frame::error(&e.to_string())).await;
        return match e {
            // A failed open frame tears the connection down; mid-session
            // failures terminate only the offending frame.
            FrameError::AuthenticationFailed => Flow::Close(Some(CloseReason {
                code: CloseCode::Policy,
                description: Some("Authentication failed".into()),
            })),
            _ => Flow::Continue,
        };
    }

    match dispatch(&ctx, &frame, session, policy, broker, chat).await {
        Ok(flow) => flow,
        Err(e) => {
            debug!("Session {}: frame failed: {}", session_id, e);
            let _ = send_frame(session, &Frame::error(&e.to_string())).await;
            Flow::Continue
        }
    }
}

/// Dispatch an authenticated frame.
async fn dispatch(
    ctx: &FrameContext,
    frame: &Frame,
    session: &mut Session,
    policy: &Arc<DestinationPolicy>,
    broker: &Arc<MessageBroker>,
    chat: &Arc<ChatService>,
) -> Result<Flow, FrameError> {
    match frame.command {
        Command::Connect | Command::Stomp => {
            let user = ctx.user().ok_or(FrameError::NotAuthenticated)?;
            broker.bind_user(&ctx.session_id, &user.username);
            let _ = send_frame(session, &Frame::connected(&ctx.session_id)).await;
            Ok(Flow::Continue)
        }

        Command::Disconnect => Ok(Flow::Close(Some(CloseReason {
            code: CloseCode::Normal,
            description: None,
        }))),

        Command::Subscribe => {
            let destination = frame.destination()?;
            let id = frame
                .header(headers::ID)
                .ok_or_else(|| FrameError::Protocol("missing 'id' header".to_string()))?;
            policy.authorize(FrameDirection::Subscribe, destination, ctx.user())?;
            broker.subscribe(
                &ctx.session_id,
                Subscription::new(SubscriptionId::new(id), destination),
            );
            Ok(Flow::Continue)
        }

        Command::Unsubscribe => {
            let id = frame
                .header(headers::ID)
                .ok_or_else(|| FrameError::Protocol("missing 'id' header".to_string()))?;
            broker.unsubscribe(&ctx.session_id, &SubscriptionId::new(id));
            Ok(Flow::Continue)
        }

        Command::Send => {
            let destination = frame.destination()?.to_string();
            policy.authorize(FrameDirection::Send, &destination, ctx.user())?;
            route_send(ctx, frame, &destination, chat).await?;
            Ok(Flow::Continue)
        }

        Command::Connected | Command::Message | Command::Error => Err(FrameError::Protocol(
            format!("client may not send {}", frame.command),
        )),
    }
}

/// Route a policy-cleared SEND to its business handler.
async fn route_send(
    ctx: &FrameContext,
    frame: &Frame,
    destination: &str,
    chat: &Arc<ChatService>,
) -> Result<(), FrameError> {
    match destination {
        "/app/chat.send" => {
            let user = ctx.user().ok_or(FrameError::NotAuthenticated)?;
            let payload: ChatSendPayload = serde_json::from_str(&frame.body)
                .map_err(|e| FrameError::InvalidPayload(e.to_string()))?;

            chat.send_message(&user.username, &payload.receiver, &payload.content)
                .await
                .map_err(|e| match e {
                    ChatError::UserNotFound(_) => {
                        FrameError::DeliveryFailed("receiver not found".to_string())
                    }
                    ChatError::InvalidMessage(msg) => FrameError::InvalidPayload(msg),
                    ChatError::Directory(_) => {
                        FrameError::DeliveryFailed("directory unavailable".to_string())
                    }
                })?;
            Ok(())
        }
        other => Err(FrameError::DeliveryFailed(format!(
            "no handler for destination '{}'",
            other
        ))),
    }
}

/// Serialize a frame onto the socket.
async fn send_frame(session: &mut Session, frame: &Frame) -> Result<(), ()> {
    session.text(frame.to_wire()).await.map_err(|_| ())
}
