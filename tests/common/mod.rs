//! Shared helpers for integration tests.

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use palaver_server::config::{ServerConfig, UserSeed};
use palaver_server::lifecycle::{self, ApplicationComponents};
use serde::Serialize;

pub const TEST_SECRET: &str = "integration-test-secret";

/// Claims shape for hand-built test tokens.
#[derive(Debug, Serialize)]
struct TestClaims {
    sub: String,
    iss: String,
    exp: usize,
    iat: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
}

/// Config with a known secret and two seeded users.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.auth.jwt_secret = TEST_SECRET.to_string();
    config.users = vec![
        UserSeed {
            username: "alice".to_string(),
            display_name: "Alice".to_string(),
            email: Some("alice@example.com".to_string()),
            image_url: None,
            role: Default::default(),
        },
        UserSeed {
            username: "bob".to_string(),
            display_name: "Bob".to_string(),
            email: None,
            image_url: None,
            role: Default::default(),
        },
    ];
    config
}

/// Bootstrapped components for the test config.
pub fn test_components() -> ApplicationComponents {
    lifecycle::bootstrap(&test_config()).expect("bootstrap failed")
}

/// Create a test JWT.
///
/// # Arguments
/// * `username` - Subject (principal name)
/// * `issuer` - Token issuer
/// * `exp_offset_secs` - Expiration offset from now (negative for expired)
pub fn create_token(username: &str, issuer: &str, exp_offset_secs: i64) -> String {
    let now = chrono::Utc::now().timestamp() as usize;
    let claims = TestClaims {
        sub: username.to_string(),
        iss: issuer.to_string(),
        exp: ((now as i64) + exp_offset_secs) as usize,
        iat: now,
        role: Some("user".to_string()),
    };

    let header = Header::new(Algorithm::HS256);
    let encoding_key = EncodingKey::from_secret(TEST_SECRET.as_bytes());
    encode(&header, &claims, &encoding_key).expect("Failed to encode JWT")
}

/// A currently valid token for a seeded user.
pub fn valid_token(username: &str) -> String {
    create_token(username, "palaver", 3600)
}
