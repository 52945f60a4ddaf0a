//! Outbound HTTP client configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_required_string, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP client configuration shared by every virtual player
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout
    #[serde(
        with = "crate::domains::utils::serde_duration_ms",
        default = "default_timeout"
    )]
    pub timeout: Duration,

    /// Cap on concurrent in-flight requests and idle connections per host
    #[serde(default = "default_max_sockets")]
    pub max_sockets: usize,

    /// Whether to keep pooled connections alive
    #[serde(default = "crate::domains::utils::default_true")]
    pub keep_alive: bool,

    /// Idle pooled connection timeout
    #[serde(
        with = "crate::domains::utils::serde_duration_ms",
        default = "default_idle_timeout"
    )]
    pub idle_timeout: Duration,

    /// Whether to verify TLS certificates
    #[serde(default = "crate::domains::utils::default_false")]
    pub verify_ssl: bool,

    /// User agent string
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            max_sockets: default_max_sockets(),
            keep_alive: true,
            idle_timeout: default_idle_timeout(),
            verify_ssl: false,
            user_agent: default_user_agent(),
        }
    }
}

impl Validatable for HttpConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.timeout.as_millis(), "timeout", self.domain_name())?;
        validate_positive(self.max_sockets, "max_sockets", self.domain_name())?;
        validate_required_string(&self.user_agent, "user_agent", self.domain_name())?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "http"
    }
}

fn default_timeout() -> Duration {
    Duration::from_millis(10_000)
}

fn default_max_sockets() -> usize {
    1000
}

fn default_idle_timeout() -> Duration {
    Duration::from_millis(90_000)
}

fn default_user_agent() -> String {
    format!("skirmish/{}", env!("CARGO_PKG_VERSION"))
}
