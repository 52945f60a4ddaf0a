//! Domain-specific configuration modules

pub mod backend;
pub mod cluster;
pub mod http;
pub mod logging;
pub mod server;
pub mod timing;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Complete harness configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SkirmishConfig {
    /// Administrative HTTP surface of this node
    #[serde(default)]
    pub server: server::ServerConfig,

    /// Worker nodes targeted by the coordinator fan-out
    #[serde(default)]
    pub cluster: cluster::ClusterConfig,

    /// Game backend endpoints exercised by virtual players
    #[serde(default)]
    pub backend: backend::BackendConfig,

    /// Outbound HTTP client configuration
    #[serde(default)]
    pub http: http::HttpConfig,

    /// Think-time delays and scheduler offsets
    #[serde(default)]
    pub timing: timing::TimingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,
}

impl SkirmishConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.server.validate()?;
        self.cluster.validate()?;
        self.backend.validate()?;
        self.http.validate()?;
        self.timing.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = SkirmishConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
