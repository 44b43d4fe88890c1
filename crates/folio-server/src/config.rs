//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use folio_shared::constants::{
    AUTH_RATE_LIMIT_MAX, AUTH_RATE_LIMIT_WINDOW_SECS, DEFAULT_HTTP_PORT, DEFAULT_TOKEN_TTL_SECS,
    MAX_UPLOAD_SIZE,
};
use folio_shared::token::TokenSigner;

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:5000`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `./data/folio.db`
    pub database_path: PathBuf,

    /// Directory uploaded images are written to and served from.
    /// Env: `UPLOAD_DIR`
    /// Default: `./uploads`
    pub upload_dir: PathBuf,

    /// Maximum size of a single uploaded file in bytes.
    /// Env: `MAX_UPLOAD_SIZE`
    /// Default: 5 MiB
    pub max_upload_size: usize,

    /// Ed25519 secret for bearer tokens (hex-encoded, 64 chars).
    /// Env: `TOKEN_SIGNING_KEY`
    /// Default: none, a random key is generated at start-up.
    pub token_signing_key: Option<[u8; 32]>,

    /// Bearer token lifetime in seconds.
    /// Env: `TOKEN_TTL_SECS`
    /// Default: 7 days
    pub token_ttl_secs: i64,

    /// Origin allowed by CORS, with credentials.
    /// Env: `FRONTEND_URL`
    /// Default: `http://localhost:5173`
    pub frontend_url: String,

    /// Whether new accounts may be created.
    /// Env: `REGISTRATION_OPEN` (true/false)
    /// Default: `true`
    pub registration_open: bool,

    /// Register/login attempts allowed per address within one window.
    /// Env: `AUTH_RATE_LIMIT_MAX`
    pub auth_rate_limit_max: usize,

    /// Env: `AUTH_RATE_LIMIT_WINDOW_SECS`
    pub auth_rate_limit_window_secs: u64,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_addr", &self.http_addr)
            .field("database_path", &self.database_path)
            .field("upload_dir", &self.upload_dir)
            .field("max_upload_size", &self.max_upload_size)
            .field(
                "token_signing_key",
                &self.token_signing_key.map(|_| "<redacted>"),
            )
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("frontend_url", &self.frontend_url)
            .field("registration_open", &self.registration_open)
            .field("auth_rate_limit_max", &self.auth_rate_limit_max)
            .field(
                "auth_rate_limit_window_secs",
                &self.auth_rate_limit_window_secs,
            )
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: PathBuf::from("./data/folio.db"),
            upload_dir: PathBuf::from("./uploads"),
            max_upload_size: MAX_UPLOAD_SIZE,
            token_signing_key: None,
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            frontend_url: "http://localhost:5173".to_string(),
            registration_open: true,
            auth_rate_limit_max: AUTH_RATE_LIMIT_MAX,
            auth_rate_limit_window_secs: AUTH_RATE_LIMIT_WINDOW_SECS,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(path) = lookup("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Some(path) = lookup("UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(path);
        }

        if let Some(val) = lookup("MAX_UPLOAD_SIZE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_upload_size = n,
                _ => tracing::warn!(value = %val, "Invalid MAX_UPLOAD_SIZE, using default"),
            }
        }

        if let Some(hex_key) = lookup("TOKEN_SIGNING_KEY") {
            match parse_hex_key(&hex_key) {
                Ok(key) => config.token_signing_key = Some(key),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Invalid TOKEN_SIGNING_KEY, a random key will be used"
                    );
                }
            }
        }

        if let Some(val) = lookup("TOKEN_TTL_SECS") {
            match val.parse::<i64>() {
                Ok(n) if n > 0 => config.token_ttl_secs = n,
                _ => tracing::warn!(value = %val, "Invalid TOKEN_TTL_SECS, using default"),
            }
        }

        if let Some(url) = lookup("FRONTEND_URL") {
            if !url.is_empty() {
                config.frontend_url = url.trim_end_matches('/').to_string();
            }
        }

        if let Some(val) = lookup("REGISTRATION_OPEN") {
            config.registration_open = val != "false" && val != "0";
        }

        if let Some(val) = lookup("AUTH_RATE_LIMIT_MAX") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.auth_rate_limit_max = n,
                _ => tracing::warn!(value = %val, "Invalid AUTH_RATE_LIMIT_MAX, using default"),
            }
        }

        if let Some(val) = lookup("AUTH_RATE_LIMIT_WINDOW_SECS") {
            match val.parse::<u64>() {
                Ok(n) if n > 0 => config.auth_rate_limit_window_secs = n,
                _ => tracing::warn!(
                    value = %val,
                    "Invalid AUTH_RATE_LIMIT_WINDOW_SECS, using default"
                ),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }

    /// The token signer for this configuration.
    pub fn token_signer(&self) -> TokenSigner {
        let ttl = chrono::Duration::seconds(self.token_ttl_secs);
        match &self.token_signing_key {
            Some(key) => TokenSigner::new(key, ttl),
            None => {
                tracing::warn!(
                    "TOKEN_SIGNING_KEY not set; using a random key, tokens will not survive a restart"
                );
                TokenSigner::generate(ttl)
            }
        }
    }
}

/// Parse a 64-character hex string into a 32-byte array.
fn parse_hex_key(hex: &str) -> Result<[u8; 32], String> {
    let hex = hex.trim();
    if hex.len() != 64 {
        return Err(format!("expected 64 hex chars, got {}", hex.len()));
    }

    let bytes = hex::decode(hex).map_err(|e| format!("invalid hex: {e}"))?;
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes);
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 5000).into());
        assert_eq!(config.max_upload_size, 5 * 1024 * 1024);
        assert_eq!(config.token_ttl_secs, 7 * 24 * 60 * 60);
        assert!(config.token_signing_key.is_none());
        assert!(config.registration_open);
        assert_eq!(config.auth_rate_limit_max, 50);
        assert_eq!(config.auth_rate_limit_window_secs, 900);
    }

    #[test]
    fn test_env_overrides() {
        let key = "ab".repeat(32);
        let config = config_from(&[
            ("HTTP_ADDR", "127.0.0.1:8081"),
            ("DATABASE_PATH", "/tmp/x.db"),
            ("TOKEN_SIGNING_KEY", &key),
            ("REGISTRATION_OPEN", "false"),
            ("FRONTEND_URL", "https://me.dev/"),
            ("AUTH_RATE_LIMIT_MAX", "3"),
        ]);
        assert_eq!(config.http_addr, ([127, 0, 0, 1], 8081).into());
        assert_eq!(config.database_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.token_signing_key, Some([0xab; 32]));
        assert!(!config.registration_open);
        assert_eq!(config.frontend_url, "https://me.dev");
        assert_eq!(config.auth_rate_limit_max, 3);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = config_from(&[
            ("HTTP_ADDR", "not an address"),
            ("MAX_UPLOAD_SIZE", "huge"),
            ("TOKEN_TTL_SECS", "-5"),
            ("TOKEN_SIGNING_KEY", "abcd"),
        ]);
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 5000).into());
        assert_eq!(config.max_upload_size, 5 * 1024 * 1024);
        assert_eq!(config.token_ttl_secs, 7 * 24 * 60 * 60);
        assert!(config.token_signing_key.is_none());
    }

    #[test]
    fn test_parse_hex_key() {
        assert_eq!(parse_hex_key(&"0f".repeat(32)).unwrap(), [0x0f; 32]);
        assert!(parse_hex_key("abcd").is_err());
        assert!(parse_hex_key(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn test_configured_key_survives_restart() {
        let config = ServerConfig {
            token_signing_key: Some([7u8; 32]),
            ..Default::default()
        };
        let token = config
            .token_signer()
            .issue(folio_shared::UserId::new())
            .unwrap();
        assert!(config.token_signer().verify(&token).is_ok());
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = ServerConfig {
            token_signing_key: Some([0xab; 32]),
            ..Default::default()
        };
        let printed = format!("{config:?}");
        assert!(printed.contains("<redacted>"));
        assert!(!printed.contains("171"));
    }
}
