//! Bearer-token authentication flow.
//!
//! Shared by the HTTP middleware, the WebSocket handshake gate, and the
//! frame-level CONNECT handling, so all three surfaces resolve identities
//! the same way: verify the token, look the principal up in the directory,
//! cross-check the claimed role, and build a fresh [`AuthenticatedUser`].

use crate::context::AuthenticatedUser;
use crate::directory::UserDirectory;
use crate::error::{AuthError, AuthResult};
use crate::verifier::CredentialVerifier;
use log::{debug, warn};
use std::sync::Arc;

/// Prefix of a bearer Authorization value.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Strip the bearer prefix from an Authorization value.
pub fn strip_bearer(header_value: &str) -> AuthResult<&str> {
    header_value
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            AuthError::MalformedAuthorization(
                "Authorization value must start with 'Bearer '".to_string(),
            )
        })
}

/// Authenticate a raw bearer token.
///
/// The directory record is authoritative for the role; a token claiming a
/// different role than the directory holds is rejected rather than trusted.
pub async fn authenticate_bearer(
    token: &str,
    verifier: &Arc<dyn CredentialVerifier>,
    directory: &Arc<dyn UserDirectory>,
) -> AuthResult<AuthenticatedUser> {
    let claims = verifier.verify(token)?;
    let username = claims.username();

    let user = directory.get_user_by_username(&username).await?;

    let role = match claims.role {
        Some(claimed_role) => {
            if claimed_role != user.role {
                warn!(
                    "JWT role mismatch: claimed={:?}, actual={:?} for user={}",
                    claimed_role, user.role, user.username
                );
                return Err(AuthError::InvalidCredentials(
                    "Token role does not match user role".to_string(),
                ));
            }
            claimed_role
        }
        None => user.role,
    };

    debug!("Bearer authentication succeeded: user={} role={:?}", user.username, role);

    Ok(AuthenticatedUser::new(user.user_id, user.username, role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryUserDirectory;
    use crate::jwt::PALAVER_ISSUER;
    use crate::verifier::JwtVerifier;
    use palaver_commons::{Role, UserId, UserName, UserRecord};

    fn fixture() -> (Arc<dyn CredentialVerifier>, Arc<dyn UserDirectory>, JwtVerifier) {
        let directory = InMemoryUserDirectory::new();
        directory.insert(UserRecord::new(
            UserId::new("u_alice"),
            UserName::new("alice"),
            "Alice",
            Role::User,
        ));

        let minter = JwtVerifier::new("bearer-secret", vec![PALAVER_ISSUER.to_string()]);
        let verifier: Arc<dyn CredentialVerifier> =
            Arc::new(JwtVerifier::new("bearer-secret", vec![PALAVER_ISSUER.to_string()]));
        (verifier, Arc::new(directory), minter)
    }

    #[test]
    fn strip_bearer_variants() {
        assert_eq!(strip_bearer("Bearer abc").unwrap(), "abc");
        assert!(strip_bearer("Basic abc").is_err());
        assert!(strip_bearer("Bearer ").is_err());
        assert!(strip_bearer("abc").is_err());
    }

    #[tokio::test]
    async fn valid_token_resolves_identity() {
        let (verifier, directory, minter) = fixture();
        let token = minter.mint_token(&UserName::new("alice"), Role::User).unwrap();

        let user = authenticate_bearer(&token, &verifier, &directory).await.unwrap();
        assert_eq!(user.username.as_str(), "alice");
        assert_eq!(user.role, Role::User);
    }

    #[tokio::test]
    async fn unknown_principal_rejected() {
        let (verifier, directory, minter) = fixture();
        let token = minter.mint_token(&UserName::new("mallory"), Role::User).unwrap();

        let result = authenticate_bearer(&token, &verifier, &directory).await;
        assert!(matches!(result, Err(AuthError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn role_mismatch_rejected() {
        let (verifier, directory, minter) = fixture();
        // Directory says User; token claims Admin.
        let token = minter.mint_token(&UserName::new("alice"), Role::Admin).unwrap();

        let result = authenticate_bearer(&token, &verifier, &directory).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials(_))));
    }
}
