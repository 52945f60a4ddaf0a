//! Game backend endpoint configuration

use crate::error::ConfigResult;
use crate::validation::{validate_port, validate_required_string, validate_url, Validatable};
use serde::{Deserialize, Serialize};

/// Addresses of the services a virtual player talks to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Load-balanced lobbies service, including its version prefix
    #[serde(default = "default_lobbies_uri")]
    pub lobbies_uri: String,

    /// Player accounts service
    #[serde(default = "default_player_accounts_uri")]
    pub player_accounts_uri: String,

    /// Player stats service
    #[serde(default = "default_player_stats_uri")]
    pub player_stats_uri: String,

    /// Chat relay host
    #[serde(default = "default_chat_host")]
    pub chat_host: String,

    /// Chat relay port
    #[serde(default = "default_chat_port")]
    pub chat_port: u16,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            lobbies_uri: default_lobbies_uri(),
            player_accounts_uri: default_player_accounts_uri(),
            player_stats_uri: default_player_stats_uri(),
            chat_host: default_chat_host(),
            chat_port: default_chat_port(),
        }
    }
}

impl Validatable for BackendConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_url(&self.lobbies_uri, "lobbies_uri", self.domain_name())?;
        validate_url(
            &self.player_accounts_uri,
            "player_accounts_uri",
            self.domain_name(),
        )?;
        validate_url(&self.player_stats_uri, "player_stats_uri", self.domain_name())?;
        validate_required_string(&self.chat_host, "chat_host", self.domain_name())?;
        validate_port(self.chat_port, "chat_port", self.domain_name())?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "backend"
    }
}

fn default_lobbies_uri() -> String {
    "http://127.0.0.1:10000/v1".to_string()
}

fn default_player_accounts_uri() -> String {
    "https://127.0.0.1".to_string()
}

fn default_player_stats_uri() -> String {
    "http://127.0.0.1:10500".to_string()
}

fn default_chat_host() -> String {
    "127.0.0.1".to_string()
}

fn default_chat_port() -> u16 {
    10700
}
