use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Listener and admin listener use the same address {0}:{1}")]
    ListenerConflict(String, u16),

    #[error("Rate limit max_requests cannot be 0")]
    ZeroRateLimit,

    #[error("Rate limit window_secs cannot be 0")]
    ZeroRateLimitWindow,

    #[error("Invalid tenancy config: {0}")]
    Tenancy(#[from] tenancy::errors::ValidationError),
}

/// Gateway configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Main listener for incoming API requests
    pub listener: Listener,
    /// Admin listener for health and readiness checks
    pub admin_listener: Listener,
    /// Reject requests that do not resolve to a known organization with 404.
    /// When false they proceed without tenant scope.
    #[serde(default)]
    pub require_tenant: bool,
    /// Per client IP request limit. Disabled when absent.
    pub rate_limit: Option<RateLimitConfig>,
    pub tenancy: tenancy::config::Config,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if self.listener == self.admin_listener {
            return Err(ValidationError::ListenerConflict(
                self.listener.host.clone(),
                self.listener.port,
            ));
        }

        if let Some(rate_limit) = &self.rate_limit {
            rate_limit.validate()?;
        }

        self.tenancy.validate()?;
        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RateLimitConfig {
    /// Requests allowed per client IP within one window
    pub max_requests: u32,
    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Key clients by `X-Forwarded-For` / `X-Real-IP`. Only enable behind a
    /// proxy that overwrites these headers, otherwise clients pick their own
    /// key. When false the connection's peer address is used.
    #[serde(default)]
    pub trust_forwarded_headers: bool,
}

fn default_window_secs() -> u64 {
    60
}

impl RateLimitConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_requests == 0 {
            return Err(ValidationError::ZeroRateLimit);
        }
        if self.window_secs == 0 {
            return Err(ValidationError::ZeroRateLimitWindow);
        }
        Ok(())
    }
}
