//! Application Configuration
//!
//! Configuration for the session gate. Read once at startup and shared
//! read-only afterwards.

use std::time::Duration;

use platform::cookie::CookieConfig;
use platform::crypto::Signer;

use crate::domain::value_object::node_id::NodeId;
use crate::domain::value_object::node_load::{DEFAULT_REJECT_LOAD, NodeLoad};
use crate::error::{SessionError, SessionResult};

/// Re-export SameSite from platform
pub use platform::cookie::SameSite;

/// 30 days
pub const DEFAULT_AUTH_VALID_SECS: i64 = 30 * 24 * 60 * 60;

/// Session gate configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Shared signing secret; must be non-empty
    pub session_secret: Vec<u8>,
    /// Identity token validity window
    pub auth_valid_secs: i64,
    /// Container cookie lifetime; 0 means "same as the identity window"
    pub session_max_age_secs: i64,
    /// Own load at or above which secondary-hop launches are refused
    pub reject_load_threshold: u8,
    /// Identity of this serving node
    pub node_id: String,
    /// Upper bound on every oracle call
    pub oracle_timeout: Duration,
    /// Cookie carrying the identity token
    pub identity_cookie_name: String,
    /// Load-balancer stickiness cookies cleared on deny
    pub lb_tracker_cookies: Vec<String>,
    /// Attributes applied to every cookie we write
    pub cookie: CookieConfig,
    /// Expose the development sign-in endpoint
    pub dev_sign_in: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_secret: Vec::new(),
            auth_valid_secs: DEFAULT_AUTH_VALID_SECS,
            session_max_age_secs: 0,
            reject_load_threshold: DEFAULT_REJECT_LOAD,
            node_id: "localhost".to_string(),
            oracle_timeout: Duration::from_secs(2),
            identity_cookie_name: "session_auth".to_string(),
            lb_tracker_cookies: vec!["AWSELB".to_string()],
            cookie: CookieConfig::default(),
            dev_sign_in: false,
        }
    }
}

impl SessionConfig {
    /// Create config with a random session secret (for development)
    pub fn with_random_secret() -> Self {
        Self {
            session_secret: platform::crypto::random_bytes(32),
            ..Default::default()
        }
    }

    /// Create config for development (insecure cookie, sign-in endpoint on)
    pub fn development() -> Self {
        Self {
            cookie: CookieConfig {
                secure: false,
                ..CookieConfig::default()
            },
            dev_sign_in: true,
            ..Self::with_random_secret()
        }
    }

    /// Build the signer; fails when no secret is configured
    pub fn signer(&self) -> SessionResult<Signer> {
        Ok(Signer::new(self.session_secret.clone())?)
    }

    pub fn node(&self) -> SessionResult<NodeId> {
        Ok(NodeId::new(self.node_id.clone())?)
    }

    /// Check the numeric settings once, before any request is served
    pub fn validate(&self) -> SessionResult<()> {
        if self.auth_valid_secs <= 0
            || chrono::Duration::try_seconds(self.auth_valid_secs).is_none()
        {
            return Err(SessionError::Config(format!(
                "auth_valid_secs must be positive and in range, got {}",
                self.auth_valid_secs
            )));
        }
        if self.session_max_age_secs < 0
            || chrono::Duration::try_seconds(self.session_max_age_secs).is_none()
        {
            return Err(SessionError::Config(format!(
                "session_max_age_secs must be zero or positive, got {}",
                self.session_max_age_secs
            )));
        }
        if self.reject_load_threshold > NodeLoad::MAX {
            return Err(SessionError::Config(format!(
                "reject_load_threshold must be at most {}, got {}",
                NodeLoad::MAX,
                self.reject_load_threshold
            )));
        }
        Ok(())
    }

    /// Lifetime of the live-session cookies
    pub fn container_cookie_max_age(&self) -> i64 {
        if self.session_max_age_secs == 0 {
            self.auth_valid_secs
        } else {
            self.session_max_age_secs
        }
    }
}
