//! Handshake admission gate.
//!
//! Runs once per connection attempt, before any protocol machinery starts.
//! Transport negotiation sub-paths pass untouched; everything else must
//! present a bearer token in the `access_token` query parameter or the
//! Authorization header, verified before the upgrade proceeds. A rejected
//! handshake creates no state of any kind.

use actix_web::{HttpRequest, HttpResponse};
use log::debug;
use palaver_auth::{authenticate_bearer, bearer, AuthError, CredentialVerifier, UserDirectory};
use palaver_commons::UserName;
use serde_json::json;
use std::sync::Arc;

/// Sub-paths owned by the fallback transport layer (SockJS-style probes and
/// polling endpoints). These carry no session semantics and are admitted
/// without token inspection.
const PROBE_PATH_MARKERS: &[&str] = &[
    "/iframe.html",
    "/xhr",
    "/xhr_send",
    "/xhr_streaming",
    "/eventsource",
    "/jsonp",
    "/info",
];

/// Result of the admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// A transport probe: answer it directly, no upgrade.
    Probe,
    /// Proceed with the WebSocket upgrade.
    ///
    /// `principal` is set when the handshake itself verified a token; the
    /// in-band transport path (`.../websocket`) is admitted without one and
    /// relies entirely on frame-level CONNECT authentication.
    Open { principal: Option<UserName> },
}

/// True for paths served by the fallback transport negotiation layer.
pub fn is_transport_probe(path: &str) -> bool {
    PROBE_PATH_MARKERS.iter().any(|marker| path.contains(marker))
}

/// Decide whether a connection attempt may proceed.
pub async fn authorize_handshake(
    req: &HttpRequest,
    verifier: &Arc<dyn CredentialVerifier>,
    directory: &Arc<dyn UserDirectory>,
) -> Result<Admission, AuthError> {
    let path = req.path();

    // The in-band transport endpoint is not the credential checkpoint; the
    // CONNECT frame is.
    if path.contains("/websocket") {
        return Ok(Admission::Open { principal: None });
    }

    if is_transport_probe(path) {
        return Ok(Admission::Probe);
    }

    let token = token_from_query(req.query_string())
        .or_else(|| token_from_header(req))
        .ok_or(AuthError::MissingAuthorization)?;

    let user = authenticate_bearer(&token, verifier, directory).await?;
    debug!("Handshake admitted for {} on {}", user.username, path);

    Ok(Admission::Open {
        principal: Some(user.username),
    })
}

/// Answer a probe request.
pub fn probe_response(req: &HttpRequest) -> HttpResponse {
    if req.path().contains("/info") {
        // Transport capability advertisement expected by SockJS-style
        // clients before they pick a transport.
        let entropy = u32::from_le_bytes(
            uuid::Uuid::new_v4().as_bytes()[..4]
                .try_into()
                .unwrap_or([0; 4]),
        );
        HttpResponse::Ok().json(json!({
            "websocket": true,
            "origins": ["*:*"],
            "cookie_needed": false,
            "entropy": entropy,
        }))
    } else {
        HttpResponse::Ok().finish()
    }
}

fn token_from_query(query: &str) -> Option<String> {
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("access_token="))
        .filter(|token| !token.is_empty())
        .map(|token| token.to_string())
}

fn token_from_header(req: &HttpRequest) -> Option<String> {
    let value = req.headers().get("Authorization")?.to_str().ok()?;
    bearer::strip_bearer(value).ok().map(|token| token.to_string())
}
