// Configuration module
use palaver_commons::Role;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub server: ServerSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub security: SecuritySettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Users the in-memory directory is seeded with at startup.
    #[serde(default)]
    pub users: Vec<UserSeed>,
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

/// Token verification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// HS256 shared secret for token verification
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Comma-separated issuer allow-list; the internal issuer is always
    /// included
    #[serde(default = "default_trusted_issuers")]
    pub trusted_issuers: String,
    #[serde(default = "default_token_expiry_hours")]
    pub token_expiry_hours: i64,
}

impl AuthSettings {
    /// Parse the issuer allow-list, always including the internal issuer.
    pub fn issuer_list(&self) -> Vec<String> {
        let mut issuers: Vec<String> = self
            .trusted_issuers
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let internal = palaver_auth::jwt::PALAVER_ISSUER.to_string();
        if !issuers.contains(&internal) {
            issuers.insert(0, internal);
        }
        issuers
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            trusted_issuers: default_trusted_issuers(),
            token_expiry_hours: default_token_expiry_hours(),
        }
    }
}

/// Security settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecuritySettings {
    #[serde(default)]
    pub cors: CorsSettings,
    /// Maximum accepted size of one inbound WebSocket frame in bytes
    #[serde(default = "default_max_ws_message_size")]
    pub max_ws_message_size: usize,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            cors: CorsSettings::default(),
            max_ws_message_size: default_max_ws_message_size(),
        }
    }
}

/// CORS settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsSettings {
    #[serde(default = "default_cors_origins")]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_cors_methods")]
    pub allowed_methods: Vec<String>,
    #[serde(default = "default_cors_headers")]
    pub allowed_headers: Vec<String>,
    #[serde(default = "default_true")]
    pub allow_credentials: bool,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            allowed_origins: default_cors_origins(),
            allowed_methods: default_cors_methods(),
            allowed_headers: default_cors_headers(),
            allow_credentials: default_true(),
            max_age: default_cors_max_age(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_file")]
    pub file_path: String,
    #[serde(default = "default_true")]
    pub log_to_console: bool,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_path: default_log_file(),
            log_to_console: default_true(),
            format: default_log_format(),
        }
    }
}

/// One seed entry for the user directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSeed {
    pub username: String,
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub role: Role,
}

impl ServerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", path.display(), e))?;
        let config: ServerConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path.display(), e))?;
        Ok(config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
                workers: default_workers(),
            },
            auth: AuthSettings::default(),
            security: SecuritySettings::default(),
            logging: LoggingSettings::default(),
            users: Vec::new(),
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

fn default_jwt_secret() -> String {
    // Development fallback; production deployments set [auth] jwt_secret.
    "change-me-in-production".to_string()
}

fn default_trusted_issuers() -> String {
    palaver_auth::jwt::PALAVER_ISSUER.to_string()
}

fn default_token_expiry_hours() -> i64 {
    24
}

fn default_max_ws_message_size() -> usize {
    64 * 1024
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:4200".to_string()]
}

fn default_cors_methods() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_cors_headers() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_cors_max_age() -> u64 {
    3600
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/server.log".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let toml = r#"
            [server]
            host = "0.0.0.0"
            port = 9090

            [[users]]
            username = "alice"
            display_name = "Alice"
        "#;
        let config: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.users.len(), 1);
        assert_eq!(config.users[0].role, Role::User);
        assert_eq!(config.security.max_ws_message_size, 64 * 1024);
        assert!(config.logging.log_to_console);
    }

    #[test]
    fn issuer_list_always_contains_internal_issuer() {
        let auth = AuthSettings {
            trusted_issuers: "auth.example.com, other.example.com".to_string(),
            ..AuthSettings::default()
        };
        let issuers = auth.issuer_list();
        assert_eq!(issuers[0], palaver_auth::jwt::PALAVER_ISSUER);
        assert!(issuers.contains(&"auth.example.com".to_string()));
        assert_eq!(issuers.len(), 3);
    }
}
