// JWT validation and minting

use crate::error::{AuthError, AuthResult};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use palaver_commons::{Role, UserName};
use serde::{Deserialize, Serialize};

/// Default token expiration time in hours
pub const DEFAULT_TOKEN_EXPIRY_HOURS: i64 = 24;

/// Default issuer for Palaver tokens
pub const PALAVER_ISSUER: &str = "palaver";

/// JWT claims structure for Palaver tokens.
///
/// Standard JWT claims plus the custom role claim. The subject is the
/// username (principal name), matching what the user directory is keyed by.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (username / principal name)
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// Role (custom claim)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl JwtClaims {
    /// Create new claims for a user.
    pub fn new(username: &UserName, role: Role, expiry_hours: Option<i64>) -> Self {
        let now = chrono::Utc::now();
        let exp_hours = expiry_hours.unwrap_or(DEFAULT_TOKEN_EXPIRY_HOURS);
        let exp = now + chrono::Duration::hours(exp_hours);

        Self {
            sub: username.to_string(),
            iss: PALAVER_ISSUER.to_string(),
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
            role: Some(role),
        }
    }

    /// The principal name carried in the subject claim.
    pub fn username(&self) -> UserName {
        UserName::new(self.sub.clone())
    }
}

/// Sign a JWT from prepared claims.
pub fn generate_jwt_token(claims: &JwtClaims, secret: &str) -> AuthResult<String> {
    let header = Header::new(Algorithm::HS256);
    let encoding_key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &encoding_key)
        .map_err(|e| AuthError::EncodingError(format!("JWT encoding error: {}", e)))
}

/// Create and sign a new access token in one step.
pub fn create_and_sign_token(
    username: &UserName,
    role: Role,
    expiry_hours: Option<i64>,
    secret: &str,
) -> AuthResult<(String, JwtClaims)> {
    let claims = JwtClaims::new(username, role, expiry_hours);
    let token = generate_jwt_token(&claims, secret)?;
    Ok((token, claims))
}

/// Validate a JWT and extract its claims.
///
/// Verifies the signature, the expiration, that the issuer is in the trusted
/// list, and that the subject claim is present.
///
/// # Errors
/// - `AuthError::InvalidSignature` if signature verification fails
/// - `AuthError::TokenExpired` if the token has expired
/// - `AuthError::UntrustedIssuer` if the issuer is not in the trusted list
/// - `AuthError::MissingClaim` if the subject claim is empty
pub fn validate_jwt_token(
    token: &str,
    secret: &str,
    trusted_issuers: &[String],
) -> AuthResult<JwtClaims> {
    let _header = decode_header(token)
        .map_err(|e| AuthError::MalformedAuthorization(format!("Invalid JWT header: {}", e)))?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.validate_nbf = false;

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let token_data =
        decode::<JwtClaims>(token, &decoding_key, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            _ => AuthError::MalformedAuthorization(format!("JWT decode error: {}", e)),
        })?;

    let claims = token_data.claims;

    verify_issuer(&claims.iss, trusted_issuers)?;

    if claims.sub.is_empty() {
        return Err(AuthError::MissingClaim("sub".to_string()));
    }

    Ok(claims)
}

/// Verify the JWT issuer is in the trusted list.
///
/// # Security Note
/// If no trusted issuers are configured, ALL issuers are rejected.
fn verify_issuer(issuer: &str, trusted_issuers: &[String]) -> AuthResult<()> {
    if trusted_issuers.is_empty() {
        return Err(AuthError::UntrustedIssuer(format!(
            "No trusted issuers configured. Rejecting issuer: {}",
            issuer
        )));
    }

    if trusted_issuers.iter().any(|i| i == issuer) {
        Ok(())
    } else {
        Err(AuthError::UntrustedIssuer(issuer.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_token(secret: &str, exp_offset_secs: i64) -> String {
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = JwtClaims {
            sub: "alice".to_string(),
            iss: "palaver-test".to_string(),
            exp: ((now as i64) + exp_offset_secs) as usize,
            iat: now,
            role: Some(Role::User),
        };

        let header = Header::new(Algorithm::HS256);
        let encoding_key = EncodingKey::from_secret(secret.as_bytes());
        encode(&header, &claims, &encoding_key).unwrap()
    }

    #[test]
    fn test_validate_jwt_token_valid() {
        let secret = "test-secret-key";
        let token = create_test_token(secret, 3600);

        let trusted_issuers = vec!["palaver-test".to_string()];
        let result = validate_jwt_token(&token, secret, &trusted_issuers);
        assert!(result.is_ok());

        let claims = result.unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.iss, "palaver-test");
        assert_eq!(claims.role, Some(Role::User));
    }

    #[test]
    fn test_validate_jwt_token_wrong_secret() {
        let secret = "test-secret-key";
        let token = create_test_token(secret, 3600);

        let trusted_issuers = vec!["palaver-test".to_string()];
        let result = validate_jwt_token(&token, "wrong-secret", &trusted_issuers);
        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn test_validate_jwt_token_expired() {
        let secret = "test-secret-key";
        let token = create_test_token(secret, -3600);

        let trusted_issuers = vec!["palaver-test".to_string()];
        let result = validate_jwt_token(&token, secret, &trusted_issuers);
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_verify_issuer_trusted() {
        let trusted = vec!["palaver.io".to_string(), "auth.palaver.io".to_string()];
        assert!(verify_issuer("palaver.io", &trusted).is_ok());
        assert!(verify_issuer("auth.palaver.io", &trusted).is_ok());
    }

    #[test]
    fn test_verify_issuer_untrusted() {
        let trusted = vec!["palaver.io".to_string()];
        let result = verify_issuer("evil.com", &trusted);
        assert!(matches!(result, Err(AuthError::UntrustedIssuer(_))));
    }

    #[test]
    fn test_verify_issuer_empty_list() {
        // Empty trusted list = reject ALL issuers
        let trusted = vec![];
        let result = verify_issuer("any-issuer.com", &trusted);
        assert!(matches!(result, Err(AuthError::UntrustedIssuer(_))));
    }

    /// An empty string is not a valid JWT and must return an error, not panic.
    #[test]
    fn test_validate_empty_string_returns_error() {
        let trusted = vec!["palaver.io".to_string()];
        let result = validate_jwt_token("", "any-secret", &trusted);
        assert!(result.is_err(), "Empty token string must be rejected");
    }

    /// A token with only two segments ("header.payload", missing signature)
    /// must be rejected.
    #[test]
    fn test_validate_truncated_jwt_returns_error() {
        let trusted = vec!["palaver.io".to_string()];
        let result = validate_jwt_token("eyJhbGciOiJIUzI1NiJ9.e30", "any-secret", &trusted);
        assert!(
            result.is_err(),
            "Truncated JWT (missing signature) must be rejected"
        );
    }

    /// The subject claim is preserved verbatim; sanitising input is the job
    /// of the layers above, not the JWT validator.
    #[test]
    fn test_validate_jwt_preserves_subject_verbatim() {
        let secret = "some-secret";
        let trusted = vec!["palaver-test".to_string()];

        let odd_subject = "alice+test@example.com";
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = JwtClaims {
            sub: odd_subject.to_string(),
            iss: "palaver-test".to_string(),
            exp: now + 3600,
            iat: now,
            role: None,
        };

        let token = generate_jwt_token(&claims, secret).unwrap();
        let parsed = validate_jwt_token(&token, secret, &trusted).unwrap();
        assert_eq!(parsed.sub, odd_subject);
    }

    #[test]
    fn test_create_and_sign_token_roundtrip() {
        let secret = "roundtrip-secret";
        let trusted = vec![PALAVER_ISSUER.to_string()];
        let username = UserName::new("bob");

        let (token, claims) = create_and_sign_token(&username, Role::Admin, None, secret).unwrap();
        assert_eq!(claims.iss, PALAVER_ISSUER);

        let parsed = validate_jwt_token(&token, secret, &trusted).unwrap();
        assert_eq!(parsed.username(), username);
        assert_eq!(parsed.role, Some(Role::Admin));
    }
}
