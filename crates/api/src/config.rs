//! Process configuration, read once from the environment at startup.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

/// Minimum accepted length of an operator-supplied signing secret.
pub const MIN_SECRET_LEN: usize = 32;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_ISSUER: &str = "storefront-api";
pub const DEFAULT_TTL_MS: i64 = 86_400_000;

const DEV_SECRET: &str = "dev-only-signing-secret-change-me-before-deploying";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("JWT_SECRET must be at least 32 bytes")]
    WeakSecret,

    #[error("JWT_TTL_MS must be a positive integer, got {0:?}")]
    InvalidTtl(String),

    #[error("STOREFRONT_BIND_ADDR is not a socket address: {0:?}")]
    InvalidBindAddr(String),

    #[error("JWT_ISSUER must not be empty")]
    EmptyIssuer,

    #[error("BOOTSTRAP_ADMIN_USERNAME, BOOTSTRAP_ADMIN_PASSWORD and BOOTSTRAP_ADMIN_EMAIL must be set together")]
    IncompleteBootstrapAdmin,
}

/// Token settings shared by every request. Immutable after startup.
#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub issuer: String,
    pub ttl: Duration,
}

impl core::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("ttl_ms", &self.ttl.num_milliseconds())
            .finish()
    }
}

/// Administrator created at startup so a fresh deployment is manageable.
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
    pub email: String,
}

impl core::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub auth: AuthConfig,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl AppConfig {
    /// Config with default bind address and no bootstrap admin.
    pub fn new(auth: AuthConfig) -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            auth,
            bootstrap_admin: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind = lookup("STOREFRONT_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidBindAddr(bind.clone()))?;

        let secret = match lookup("JWT_SECRET") {
            Some(secret) if secret.len() < MIN_SECRET_LEN => return Err(ConfigError::WeakSecret),
            Some(secret) => secret,
            None => {
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
                DEV_SECRET.to_string()
            }
        };

        let ttl = match lookup("JWT_TTL_MS") {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(ms) if ms > 0 => Duration::milliseconds(ms),
                _ => return Err(ConfigError::InvalidTtl(raw)),
            },
            None => Duration::milliseconds(DEFAULT_TTL_MS),
        };

        let issuer = lookup("JWT_ISSUER").unwrap_or_else(|| DEFAULT_ISSUER.to_string());
        if issuer.trim().is_empty() {
            return Err(ConfigError::EmptyIssuer);
        }

        let bootstrap_admin = match (
            lookup("BOOTSTRAP_ADMIN_USERNAME"),
            lookup("BOOTSTRAP_ADMIN_PASSWORD"),
            lookup("BOOTSTRAP_ADMIN_EMAIL"),
        ) {
            (None, None, None) => None,
            (Some(username), Some(password), Some(email)) => Some(BootstrapAdmin {
                username,
                password,
                email,
            }),
            _ => return Err(ConfigError::IncompleteBootstrapAdmin),
        };

        Ok(Self {
            bind_addr,
            auth: AuthConfig {
                secret,
                issuer,
                ttl,
            },
            bootstrap_admin,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(cfg.auth.issuer, DEFAULT_ISSUER);
        assert_eq!(cfg.auth.ttl.num_milliseconds(), DEFAULT_TTL_MS);
        assert!(cfg.bootstrap_admin.is_none());
    }

    #[test]
    fn short_secret_is_rejected() {
        assert_eq!(load(&[("JWT_SECRET", "s3cr3t")]).unwrap_err(), ConfigError::WeakSecret);
    }

    #[test]
    fn ttl_must_be_positive() {
        for bad in ["0", "-5", "soon"] {
            assert!(matches!(
                load(&[("JWT_TTL_MS", bad)]),
                Err(ConfigError::InvalidTtl(_))
            ));
        }
        let cfg = load(&[("JWT_TTL_MS", "60000")]).unwrap();
        assert_eq!(cfg.auth.ttl, Duration::minutes(1));
    }

    #[test]
    fn bootstrap_admin_is_all_or_nothing() {
        assert_eq!(
            load(&[("BOOTSTRAP_ADMIN_USERNAME", "root")]).unwrap_err(),
            ConfigError::IncompleteBootstrapAdmin
        );
        let cfg = load(&[
            ("BOOTSTRAP_ADMIN_USERNAME", "root"),
            ("BOOTSTRAP_ADMIN_PASSWORD", "pw"),
            ("BOOTSTRAP_ADMIN_EMAIL", "root@example.com"),
        ])
        .unwrap();
        assert_eq!(cfg.bootstrap_admin.unwrap().username, "root");
    }

    #[test]
    fn debug_output_hides_secrets() {
        let cfg = load(&[
            ("JWT_SECRET", "0123456789abcdef0123456789abcdef-secret"),
            ("BOOTSTRAP_ADMIN_USERNAME", "root"),
            ("BOOTSTRAP_ADMIN_PASSWORD", "hunter2"),
            ("BOOTSTRAP_ADMIN_EMAIL", "root@example.com"),
        ])
        .unwrap();
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("0123456789abcdef"));
        assert!(!rendered.contains("hunter2"));
    }
}
