//! User agent configuration
//!
//! ```rust
//! use std::time::Duration;
//! use sipua_dialog_core::ua::UaConfig;
//!
//! let config = UaConfig::default()
//!     .with_response_timeout(Duration::from_secs(8))
//!     .with_compact_headers(true)
//!     .with_user_agent("sipua/0.1");
//!
//! assert_eq!(config.default_port, 5060);
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// RFC 3261 round-trip time estimate
pub const T1: Duration = Duration::from_millis(500);

/// How long an outgoing request waits for its response (64 * T1, the
/// Timer B / Timer F value)
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_millis(64 * 500);

pub const DEFAULT_SIP_PORT: u16 = 5060;

pub const DEFAULT_MAX_FORWARDS: u32 = 70;

/// Configuration of a [`UserAgent`](crate::ua::UserAgent)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UaConfig {
    /// Upper bound on waiting for a correlated response
    pub response_timeout: Duration,

    /// Port used when a URI or Via carries none
    pub default_port: u16,

    /// Render header names in compact form
    pub compact_headers: bool,

    /// Max-Forwards put on outgoing requests that carry none
    pub max_forwards: u32,

    /// Product string sent as User-Agent on requests and Server on responses
    pub user_agent: Option<String>,
}

impl Default for UaConfig {
    fn default() -> Self {
        Self {
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            default_port: DEFAULT_SIP_PORT,
            compact_headers: false,
            max_forwards: DEFAULT_MAX_FORWARDS,
            user_agent: None,
        }
    }
}

impl UaConfig {
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_default_port(mut self, port: u16) -> Self {
        self.default_port = port;
        self
    }

    pub fn with_compact_headers(mut self, compact: bool) -> Self {
        self.compact_headers = compact;
        self
    }

    pub fn with_max_forwards(mut self, max_forwards: u32) -> Self {
        self.max_forwards = max_forwards;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.response_timeout.is_zero() {
            return Err("Response timeout must be greater than 0".to_string());
        }

        if self.default_port == 0 {
            return Err("Default port must be greater than 0".to_string());
        }

        if let Some(user_agent) = &self.user_agent {
            if user_agent.trim().is_empty() {
                return Err("User agent must not be blank".to_string());
            }
        }

        Ok(())
    }
}
