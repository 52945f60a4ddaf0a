//! Cluster (worker node) configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_url, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Worker nodes addressed by the run coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Base URIs of the worker nodes, without port
    #[serde(default = "default_load_test_uris")]
    pub load_test_uris: Vec<String>,

    /// Timeout for each fan-out call
    #[serde(
        with = "crate::domains::utils::serde_duration_ms",
        default = "default_request_timeout"
    )]
    pub request_timeout: Duration,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            load_test_uris: default_load_test_uris(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl ClusterConfig {
    /// Full URL of `path` on every worker node
    pub fn node_urls(&self, port: u16, path: &str) -> Vec<String> {
        self.load_test_uris
            .iter()
            .map(|uri| format!("{}:{}{}", uri.trim_end_matches('/'), port, path))
            .collect()
    }
}

impl Validatable for ClusterConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.load_test_uris.is_empty() {
            return Err(self.validation_error("load_test_uris must name at least one node"));
        }
        for uri in &self.load_test_uris {
            validate_url(uri, "load_test_uris", self.domain_name())?;
        }
        validate_positive(
            self.request_timeout.as_millis(),
            "request_timeout",
            self.domain_name(),
        )?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "cluster"
    }
}

fn default_load_test_uris() -> Vec<String> {
    vec!["http://127.0.0.1".to_string()]
}

fn default_request_timeout() -> Duration {
    Duration::from_millis(10_000)
}
