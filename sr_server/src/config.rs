//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated
//! configuration.

use std::net::SocketAddr;
use std::time::Duration;
use stockroom::db::DatabaseConfig;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Security configuration
    pub security: SecurityConfig,
    /// Authentication policy configuration
    pub auth: AuthPolicyConfig,
}

/// Security-related configuration
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Password hashing pepper (required)
    pub password_pepper: String,
    /// Whether session cookies carry the Secure attribute. Disable only
    /// for plain-HTTP local development.
    pub cookie_secure: bool,
}

/// Lockout and session policy
#[derive(Debug, Clone)]
pub struct AuthPolicyConfig {
    /// Consecutive failed logins at which an account locks
    pub lockout_threshold: u32,
    /// Session idle timeout in seconds
    pub idle_timeout_secs: u64,
}

impl AuthPolicyConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = bind_override
            .or_else(|| {
                std::env::var("SERVER_BIND")
                    .ok()
                    .and_then(|s| s.parse().ok())
            })
            .unwrap_or_else(|| {
                "127.0.0.1:3000"
                    .parse()
                    .expect("Default bind address is valid")
            });

        let mut database = DatabaseConfig::from_env();
        if let Some(url) = database_url_override {
            database.database_url = url;
        }

        // Security configuration (REQUIRED)
        let password_pepper =
            std::env::var("PASSWORD_PEPPER").map_err(|_| ConfigError::MissingRequired {
                var: "PASSWORD_PEPPER".to_string(),
                hint: "Generate with: openssl rand -hex 16".to_string(),
            })?;

        if password_pepper.len() < 16 {
            return Err(ConfigError::Invalid {
                var: "PASSWORD_PEPPER".to_string(),
                reason: "Must be at least 16 characters (64-bit security)".to_string(),
            });
        }

        let security = SecurityConfig {
            password_pepper,
            cookie_secure: parse_env_or("SESSION_COOKIE_SECURE", true),
        };

        let auth = AuthPolicyConfig {
            lockout_threshold: parse_env_or("LOCKOUT_THRESHOLD", 5),
            // 10 minutes. The idle window and the cookie Max-Age come from
            // this one value, so they cannot drift apart.
            idle_timeout_secs: parse_env_or("SESSION_IDLE_TIMEOUT_SECS", 600),
        };

        let config = ServerConfig {
            bind,
            database,
            security,
            auth,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.lockout_threshold == 0 {
            return Err(ConfigError::Invalid {
                var: "LOCKOUT_THRESHOLD".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.auth.idle_timeout_secs < 60 {
            return Err(ConfigError::Invalid {
                var: "SESSION_IDLE_TIMEOUT_SECS".to_string(),
                reason: "Must be at least 60 seconds".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
