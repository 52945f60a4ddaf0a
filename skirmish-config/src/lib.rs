//! Domain-driven configuration for the skirmish load harness
//!
//! Configuration is split by functional domain (server, cluster, backend,
//! http, timing, logging). Every domain has defaults, can be overridden from
//! `SKIRMISH_*` environment variables and is validated before use.

pub mod error;
pub mod loader;
pub mod validation;

pub mod domains;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

pub use domains::{
    backend::BackendConfig, cluster::ClusterConfig, http::HttpConfig, logging::LoggingConfig,
    server::ServerConfig, timing::TimingConfig, SkirmishConfig,
};

pub use domains::utils::serde_duration_ms;
