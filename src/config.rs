use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub node: NodeConfig,
    pub tokens: TokenConfig,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_address: String,
    pub data_dir: String,
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Access-token lifetime. Short enough to limit exposure if leaked,
    /// long enough to avoid constant re-issuance.
    pub access_ttl_seconds: u64,
    /// How often the background cleaner prunes expired sessions
    pub cleanup_interval_seconds: u64,
    /// Refresh-token session lifetime (fixed absolute expiry, no sliding)
    pub session_ttl_seconds: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_ttl_seconds: 15 * 60,           // 15 minutes
            cleanup_interval_seconds: 3600,        // 1 hour
            session_ttl_seconds: 10 * 24 * 3600,   // 10 days
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let defaults = TokenConfig::default();
        let access_ttl_seconds = std::env::var("ACCESS_TOKEN_TTL_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.access_ttl_seconds);
        let session_ttl_seconds = std::env::var("SESSION_TTL_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.session_ttl_seconds);
        let cleanup_interval_seconds = std::env::var("CLEANUP_INTERVAL_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.cleanup_interval_seconds);

        let config = Config {
            node: NodeConfig {
                bind_address,
                data_dir,
            },
            tokens: TokenConfig {
                access_ttl_seconds,
                cleanup_interval_seconds,
                session_ttl_seconds,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tokens.access_ttl_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "ACCESS_TOKEN_TTL_SECONDS must be greater than 0".to_string(),
            ));
        }
        if self.tokens.session_ttl_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "SESSION_TTL_SECONDS must be greater than 0".to_string(),
            ));
        }
        if self.tokens.access_ttl_seconds >= self.tokens.session_ttl_seconds {
            tracing::warn!(
                "Access-token TTL ({}s) is not shorter than the session TTL ({}s). \
                 Access tokens are meant to be the short-lived credential.",
                self.tokens.access_ttl_seconds,
                self.tokens.session_ttl_seconds
            );
        }
        Ok(())
    }

    /// Access-token TTL as a chrono duration
    pub fn access_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.tokens.access_ttl_seconds as i64)
    }

    /// Session TTL as a chrono duration
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.tokens.session_ttl_seconds as i64)
    }
}
