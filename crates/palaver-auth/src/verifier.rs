//! Credential verifier abstraction and the JWT implementation.

use crate::error::AuthResult;
use crate::jwt::{self, JwtClaims};
use palaver_commons::{Role, UserName};

/// Verifies bearer tokens and extracts the principal they were issued to.
///
/// Verification is synchronous; it is a signature check plus claim
/// validation, with no I/O.
pub trait CredentialVerifier: Send + Sync {
    /// Validate the token and return its claims.
    fn verify(&self, token: &str) -> AuthResult<JwtClaims>;

    /// True when the token is currently valid and was issued to `principal`.
    fn is_valid(&self, token: &str, principal: &UserName) -> bool;
}

/// HS256 JWT verifier with an issuer allow-list.
pub struct JwtVerifier {
    secret: String,
    trusted_issuers: Vec<String>,
    token_expiry_hours: i64,
}

impl JwtVerifier {
    pub fn new(secret: impl Into<String>, trusted_issuers: Vec<String>) -> Self {
        Self {
            secret: secret.into(),
            trusted_issuers,
            token_expiry_hours: jwt::DEFAULT_TOKEN_EXPIRY_HOURS,
        }
    }

    pub fn with_token_expiry_hours(mut self, hours: i64) -> Self {
        self.token_expiry_hours = hours;
        self
    }

    /// Mint a signed access token for a user. Used by operational tooling
    /// and tests; clients normally obtain tokens from the identity provider.
    pub fn mint_token(&self, username: &UserName, role: Role) -> AuthResult<String> {
        let (token, _claims) =
            jwt::create_and_sign_token(username, role, Some(self.token_expiry_hours), &self.secret)?;
        Ok(token)
    }
}

impl CredentialVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> AuthResult<JwtClaims> {
        jwt::validate_jwt_token(token, &self.secret, &self.trusted_issuers)
    }

    fn is_valid(&self, token: &str, principal: &UserName) -> bool {
        match self.verify(token) {
            Ok(claims) => claims.sub == principal.as_str(),
            Err(_) => false,
        }
    }
}
