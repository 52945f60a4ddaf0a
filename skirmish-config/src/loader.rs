//! Configuration loading and environment variable handling

use crate::domains::SkirmishConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "SKIRMISH".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML or JSON file with environment overrides
    ///
    /// Files ending in `.json` are parsed as JSON, everything else as YAML.
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<SkirmishConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config: SkirmishConfig = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            _ => serde_yaml::from_str(&content)?,
        };

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<SkirmishConfig> {
        let mut config = SkirmishConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<SkirmishConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut SkirmishConfig) -> ConfigResult<()> {
        self.apply_server_overrides(&mut config.server)?;
        self.apply_cluster_overrides(&mut config.cluster)?;
        self.apply_backend_overrides(&mut config.backend)?;
        self.apply_http_overrides(&mut config.http)?;
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    fn apply_server_overrides(
        &self,
        config: &mut crate::domains::server::ServerConfig,
    ) -> ConfigResult<()> {
        if let Ok(bind) = self.get_env_var("SERVER_BIND_ADDRESS") {
            config.bind_address = bind;
        }

        if let Some(port) = self.parse_env_var("SERVER_PORT")? {
            config.port = port;
        }

        Ok(())
    }

    fn apply_cluster_overrides(
        &self,
        config: &mut crate::domains::cluster::ClusterConfig,
    ) -> ConfigResult<()> {
        if let Ok(uris) = self.get_env_var("LOAD_TEST_URIS") {
            config.load_test_uris = uris
                .split(',')
                .map(str::trim)
                .filter(|uri| !uri.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(millis) = self.parse_env_var::<u64>("CLUSTER_TIMEOUT_MS")? {
            config.request_timeout = Duration::from_millis(millis);
        }

        Ok(())
    }

    fn apply_backend_overrides(
        &self,
        config: &mut crate::domains::backend::BackendConfig,
    ) -> ConfigResult<()> {
        if let Ok(uri) = self.get_env_var("LOBBIES_URI") {
            config.lobbies_uri = uri;
        }

        if let Ok(uri) = self.get_env_var("PLAYER_ACCOUNTS_URI") {
            config.player_accounts_uri = uri;
        }

        if let Ok(uri) = self.get_env_var("PLAYER_STATS_URI") {
            config.player_stats_uri = uri;
        }

        if let Ok(host) = self.get_env_var("CHAT_HOST") {
            config.chat_host = host;
        }

        if let Some(port) = self.parse_env_var("CHAT_PORT")? {
            config.chat_port = port;
        }

        Ok(())
    }

    fn apply_http_overrides(
        &self,
        config: &mut crate::domains::http::HttpConfig,
    ) -> ConfigResult<()> {
        if let Some(millis) = self.parse_env_var::<u64>("HTTP_TIMEOUT_MS")? {
            config.timeout = Duration::from_millis(millis);
        }

        if let Some(max_sockets) = self.parse_env_var("HTTP_MAX_SOCKETS")? {
            config.max_sockets = max_sockets;
        }

        if let Some(verify_ssl) = self.parse_env_var("HTTP_VERIFY_SSL")? {
            config.verify_ssl = verify_ssl;
        }

        Ok(())
    }

    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = crate::domains::logging::LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = crate::domains::logging::LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    /// Parse an optional prefixed environment variable
    fn parse_env_var<T>(&self, name: &str) -> ConfigResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_env_var(name) {
            Ok(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|e| ConfigError::EnvError(format!("Invalid {}: {}", name, e))),
            Err(_) => Ok(None),
        }
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
