//! Per-frame authentication.
//!
//! The handshake gate runs once per connection; this interceptor runs on
//! every frame. The open frame carries its own bearer token and seeds the
//! session registry; the close frame evicts it; everything in between has
//! its identity restored from (in order) the frame context, the registry,
//! or the principal the handshake attached to the connection.

use crate::error::{FrameError, FrameResult};
use crate::frame::{headers, Command, Frame};
use log::{debug, warn};
use palaver_auth::{authenticate_bearer, bearer, AuthenticatedUser, CredentialVerifier, UserDirectory};
use palaver_commons::{ConnectionInfo, SessionId, UserName};
use palaver_session::SessionRegistry;
use std::sync::Arc;

/// Attributes attached to the connection by the handshake gate.
///
/// The principal here is a fallback identity source only; it is a name, not
/// a trusted identity object, and is always re-resolved through the user
/// directory before use.
#[derive(Debug, Clone, Default)]
pub struct ConnectionAttributes {
    pub principal: Option<UserName>,
    pub connection_info: ConnectionInfo,
}

impl ConnectionAttributes {
    pub fn new(principal: Option<UserName>, connection_info: ConnectionInfo) -> Self {
        Self {
            principal,
            connection_info,
        }
    }
}

/// Identity context for one frame-processing invocation.
///
/// Carried explicitly through dispatch instead of living in any ambient
/// thread-local state, so it survives worker hops by construction. The
/// `user` field is a same-invocation convenience; the registry remains the
/// durable source of truth across frames.
#[derive(Debug, Clone)]
pub struct FrameContext {
    pub session_id: SessionId,
    pub user: Option<AuthenticatedUser>,
}

impl FrameContext {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            user: None,
        }
    }

    pub fn user(&self) -> Option<&AuthenticatedUser> {
        self.user.as_ref()
    }
}

/// Authenticates every inbound frame before dispatch.
pub struct FrameInterceptor {
    registry: Arc<SessionRegistry>,
    verifier: Arc<dyn CredentialVerifier>,
    directory: Arc<dyn UserDirectory>,
}

impl FrameInterceptor {
    pub fn new(
        registry: Arc<SessionRegistry>,
        verifier: Arc<dyn CredentialVerifier>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            registry,
            verifier,
            directory,
        }
    }

    /// Run the frame through authentication.
    ///
    /// On success the context carries a resolved identity for every command
    /// except DISCONNECT. On failure nothing has been written to the
    /// registry by this call.
    pub async fn intercept(
        &self,
        ctx: &mut FrameContext,
        frame: &Frame,
        attrs: &ConnectionAttributes,
    ) -> FrameResult<()> {
        match frame.command {
            Command::Connect | Command::Stomp => self.authenticate_open(ctx, frame).await,
            Command::Disconnect => {
                self.registry.remove(&ctx.session_id);
                ctx.user = None;
                Ok(())
            }
            _ => self.restore_identity(ctx, attrs).await,
        }
    }

    /// Full credential verification for the open frame.
    ///
    /// The frame must carry its own `Authorization: Bearer` header; the
    /// handshake-level check is not a substitute, since the handshake may
    /// have been satisfied by a transport probe sub-path. Verifier and
    /// directory failures all collapse into one uniform reason.
    async fn authenticate_open(&self, ctx: &mut FrameContext, frame: &Frame) -> FrameResult<()> {
        let header = match frame.header(headers::AUTHORIZATION) {
            Some(h) => h,
            None => {
                warn!("Session {}: open frame without Authorization header", ctx.session_id);
                return Err(FrameError::AuthenticationFailed);
            }
        };

        let token = bearer::strip_bearer(header).map_err(|e| {
            warn!("Session {}: {}", ctx.session_id, e);
            FrameError::AuthenticationFailed
        })?;

        let user = authenticate_bearer(token, &self.verifier, &self.directory)
            .await
            .map_err(|e| {
                warn!("Session {}: open frame authentication failed: {}", ctx.session_id, e);
                FrameError::AuthenticationFailed
            })?;

        self.registry.insert(ctx.session_id.clone(), user.clone());
        debug!("Session {} authenticated as {}", ctx.session_id, user.username);
        ctx.user = Some(user);
        Ok(())
    }

    /// Identity resolution for every non-open, non-close frame.
    ///
    /// Order: frame context, then registry, then the handshake principal.
    /// The handshake fallback re-resolves authorities through the directory
    /// and writes the registry entry back so later frames take the fast
    /// path. All three cold is a hard failure, never anonymous.
    async fn restore_identity(
        &self,
        ctx: &mut FrameContext,
        attrs: &ConnectionAttributes,
    ) -> FrameResult<()> {
        if ctx.user.is_some() {
            return Ok(());
        }

        if let Some(user) = self.registry.get(&ctx.session_id) {
            ctx.user = Some(user);
            return Ok(());
        }

        if let Some(principal) = &attrs.principal {
            match self.directory.get_user_by_username(principal).await {
                Ok(record) => {
                    let user =
                        AuthenticatedUser::new(record.user_id, record.username, record.role);
                    self.registry.insert(ctx.session_id.clone(), user.clone());
                    debug!(
                        "Session {}: identity restored from connection principal {}",
                        ctx.session_id, user.username
                    );
                    ctx.user = Some(user);
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        "Session {}: connection principal '{}' no longer resolvable: {}",
                        ctx.session_id, principal, e
                    );
                    return Err(FrameError::NotAuthenticated);
                }
            }
        }

        Err(FrameError::NotAuthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palaver_auth::{InMemoryUserDirectory, JwtVerifier};
    use palaver_commons::{Role, UserId, UserRecord};

    const SECRET: &str = "interceptor-secret";

    struct Fixture {
        interceptor: FrameInterceptor,
        registry: Arc<SessionRegistry>,
        minter: JwtVerifier,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(SessionRegistry::new());

        let directory = InMemoryUserDirectory::new();
        directory.insert(UserRecord::new(
            UserId::new("u_alice"),
            UserName::new("alice"),
            "Alice",
            Role::User,
        ));
        directory.insert(UserRecord::new(
            UserId::new("u_bob"),
            UserName::new("bob"),
            "Bob",
            Role::User,
        ));

        let issuers = vec![palaver_auth::jwt::PALAVER_ISSUER.to_string()];
        let verifier: Arc<dyn CredentialVerifier> =
            Arc::new(JwtVerifier::new(SECRET, issuers.clone()));

        Fixture {
            interceptor: FrameInterceptor::new(
                registry.clone(),
                verifier,
                Arc::new(directory),
            ),
            registry,
            minter: JwtVerifier::new(SECRET, issuers),
        }
    }

    fn connect_frame(token: &str) -> Frame {
        Frame::new(Command::Connect)
            .with_header(headers::ACCEPT_VERSION, "1.2")
            .with_header(headers::AUTHORIZATION, format!("Bearer {}", token))
    }

    fn send_frame() -> Frame {
        Frame::new(Command::Send).with_header(headers::DESTINATION, "/app/chat.send")
    }

    #[tokio::test]
    async fn open_frame_seeds_registry_and_context() {
        let fx = fixture();
        let token = fx.minter.mint_token(&UserName::new("alice"), Role::User).unwrap();

        let mut ctx = FrameContext::new(SessionId::new("s1"));
        fx.interceptor
            .intercept(&mut ctx, &connect_frame(&token), &ConnectionAttributes::default())
            .await
            .unwrap();

        assert_eq!(ctx.user().unwrap().username.as_str(), "alice");
        assert_eq!(
            fx.registry.get(&SessionId::new("s1")).unwrap().username.as_str(),
            "alice"
        );
    }

    #[tokio::test]
    async fn open_frame_without_header_fails_without_state() {
        let fx = fixture();
        let frame = Frame::new(Command::Connect).with_header(headers::ACCEPT_VERSION, "1.2");

        let mut ctx = FrameContext::new(SessionId::new("s1"));
        let result = fx
            .interceptor
            .intercept(&mut ctx, &frame, &ConnectionAttributes::default())
            .await;

        assert!(matches!(result, Err(FrameError::AuthenticationFailed)));
        assert!(fx.registry.is_empty());
        assert!(ctx.user().is_none());
    }

    #[tokio::test]
    async fn open_frame_with_bad_token_fails_without_state() {
        let fx = fixture();
        let mut ctx = FrameContext::new(SessionId::new("s1"));
        let result = fx
            .interceptor
            .intercept(&mut ctx, &connect_frame("junk"), &ConnectionAttributes::default())
            .await;

        assert!(matches!(result, Err(FrameError::AuthenticationFailed)));
        assert!(fx.registry.is_empty());
    }

    /// A frame processed by a different worker (fresh context) still
    /// resolves the identity seeded by the open frame.
    #[tokio::test]
    async fn later_frame_resolves_identity_from_registry() {
        let fx = fixture();
        let token = fx.minter.mint_token(&UserName::new("alice"), Role::User).unwrap();

        let mut open_ctx = FrameContext::new(SessionId::new("s1"));
        fx.interceptor
            .intercept(&mut open_ctx, &connect_frame(&token), &ConnectionAttributes::default())
            .await
            .unwrap();

        // Fresh context simulates a worker hop: nothing ambient survives.
        let mut ctx = FrameContext::new(SessionId::new("s1"));
        fx.interceptor
            .intercept(&mut ctx, &send_frame(), &ConnectionAttributes::default())
            .await
            .unwrap();

        assert_eq!(ctx.user().unwrap().username.as_str(), "alice");
    }

    #[tokio::test]
    async fn close_then_frame_fails_not_authenticated() {
        let fx = fixture();
        let token = fx.minter.mint_token(&UserName::new("alice"), Role::User).unwrap();
        let sid = SessionId::new("s1");

        let mut ctx = FrameContext::new(sid.clone());
        fx.interceptor
            .intercept(&mut ctx, &connect_frame(&token), &ConnectionAttributes::default())
            .await
            .unwrap();

        let mut ctx = FrameContext::new(sid.clone());
        fx.interceptor
            .intercept(&mut ctx, &Frame::new(Command::Disconnect), &ConnectionAttributes::default())
            .await
            .unwrap();

        let mut ctx = FrameContext::new(sid);
        let result = fx
            .interceptor
            .intercept(&mut ctx, &send_frame(), &ConnectionAttributes::default())
            .await;
        assert!(matches!(result, Err(FrameError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let fx = fixture();
        let sid = SessionId::new("s1");

        for _ in 0..2 {
            let mut ctx = FrameContext::new(sid.clone());
            fx.interceptor
                .intercept(
                    &mut ctx,
                    &Frame::new(Command::Disconnect),
                    &ConnectionAttributes::default(),
                )
                .await
                .unwrap();
        }
    }

    /// The handshake principal is a usable fallback, gets re-resolved via
    /// the directory, and rewrites the registry for the fast path.
    #[tokio::test]
    async fn connection_principal_fallback_rewrites_registry() {
        let fx = fixture();
        let sid = SessionId::new("s1");
        let attrs =
            ConnectionAttributes::new(Some(UserName::new("bob")), ConnectionInfo::default());

        let mut ctx = FrameContext::new(sid.clone());
        fx.interceptor.intercept(&mut ctx, &send_frame(), &attrs).await.unwrap();

        assert_eq!(ctx.user().unwrap().username.as_str(), "bob");
        assert_eq!(fx.registry.get(&sid).unwrap().username.as_str(), "bob");
    }

    #[tokio::test]
    async fn stale_connection_principal_is_a_hard_failure() {
        let fx = fixture();
        let attrs =
            ConnectionAttributes::new(Some(UserName::new("deleted-user")), ConnectionInfo::default());

        let mut ctx = FrameContext::new(SessionId::new("s1"));
        let result = fx.interceptor.intercept(&mut ctx, &send_frame(), &attrs).await;
        assert!(matches!(result, Err(FrameError::NotAuthenticated)));
        assert!(fx.registry.is_empty());
    }
}
