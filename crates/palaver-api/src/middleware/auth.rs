//! Bearer authentication middleware for the REST API.
//!
//! Extracts the Authorization header, runs the shared bearer flow, and
//! attaches the resolved [`AuthenticatedUser`] to request extensions.
//! Returns 401 with a JSON error body on any failure.
//!
//! Protected endpoints read the identity back via request extensions:
//!
//! ```rust,ignore
//! let user = req.extensions().get::<AuthenticatedUser>().cloned();
//! ```

use actix_web::{
    body::{BoxBody, EitherBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage, HttpResponse,
};
use futures_util::future::LocalBoxFuture;
use log::{debug, warn};
use palaver_auth::{authenticate_bearer, bearer, CredentialVerifier, UserDirectory};
use serde_json::json;
use std::{
    future::{ready, Ready},
    rc::Rc,
    sync::Arc,
};

/// Authentication middleware factory.
pub struct AuthMiddleware {
    verifier: Arc<dyn CredentialVerifier>,
    directory: Arc<dyn UserDirectory>,
}

impl AuthMiddleware {
    pub fn new(verifier: Arc<dyn CredentialVerifier>, directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            verifier,
            directory,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            verifier: self.verifier.clone(),
            directory: self.directory.clone(),
        }))
    }
}

/// Authentication middleware service instance.
pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    verifier: Arc<dyn CredentialVerifier>,
    directory: Arc<dyn UserDirectory>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let verifier = self.verifier.clone();
        let directory = self.directory.clone();

        Box::pin(async move {
            let remote_addr = req.peer_addr().map(|addr| addr.to_string());

            let auth_header = match req.headers().get("Authorization") {
                Some(header) => match header.to_str() {
                    Ok(s) => s.to_string(),
                    Err(_) => {
                        warn!("Invalid Authorization header format from {:?}", remote_addr);
                        return Ok(unauthorized(
                            req,
                            "INVALID_AUTHORIZATION_HEADER",
                            "Authorization header contains invalid characters",
                        ));
                    }
                },
                None => {
                    warn!("Missing Authorization header from {:?}", remote_addr);
                    return Ok(unauthorized(
                        req,
                        "MISSING_AUTHORIZATION",
                        "Authorization header is required. Use 'Authorization: Bearer <token>'",
                    ));
                }
            };

            let token = match bearer::strip_bearer(&auth_header) {
                Ok(token) => token.to_string(),
                Err(_) => {
                    return Ok(unauthorized(
                        req,
                        "MALFORMED_AUTHORIZATION",
                        "Authorization header must start with 'Bearer '",
                    ));
                }
            };

            match authenticate_bearer(&token, &verifier, &directory).await {
                Ok(user) => {
                    debug!("Request authenticated as {}", user.username);
                    req.extensions_mut().insert(user);
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(e) => {
                    warn!("Bearer authentication failed from {:?}: {}", remote_addr, e);
                    Ok(unauthorized(
                        req,
                        "INVALID_TOKEN",
                        "Token is invalid or expired",
                    ))
                }
            }
        })
    }
}

fn unauthorized<B>(
    req: ServiceRequest,
    code: &str,
    message: &str,
) -> ServiceResponse<EitherBody<B, BoxBody>> {
    let (req, _) = req.into_parts();
    let response = HttpResponse::Unauthorized().json(json!({
        "error": code,
        "message": message,
    }));
    ServiceResponse::new(req, response).map_into_right_body()
}
