//! HTTP client implementation

use crate::config::HttpConfig;
use crate::errors::HttpError;
use crate::form::form_pairs;
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Decoded response of a form POST
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Body parsed as JSON, or a JSON string holding the raw text
    pub body: JsonValue,
    /// Wall time spent on the call
    pub elapsed: Duration,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client trait for making form-encoded POST requests
#[async_trait::async_trait]
pub trait HttpClient: Send + Sync {
    /// POST `body` (a flat JSON object, or nothing) as a form and decode the reply
    async fn post_form(&self, url: &str, body: Option<&JsonValue>)
        -> Result<HttpResponse, HttpError>;
}

/// HTTP Manager owning the shared connection pool, with mock support
#[derive(Debug, Clone)]
pub struct HttpManager {
    offline: bool,
    mocks: HashMap<String, JsonValue>,
    config: HttpConfig,
    client: Client,
    permits: Arc<Semaphore>,
}

impl HttpManager {
    /// Create a new HttpManager in online mode with default configuration
    pub fn new() -> Result<Self, HttpError> {
        Self::with_config(HttpConfig::default())
    }

    /// Create a new HttpManager with specific configuration
    ///
    /// The underlying client is built once and reused, so connections are
    /// pooled across every caller sharing this manager.
    pub fn with_config(config: HttpConfig) -> Result<Self, HttpError> {
        debug!(
            timeout_ms = config.timeout.as_millis() as u64,
            max_sockets = config.max_sockets,
            keep_alive = config.keep_alive,
            "Creating HttpManager"
        );

        if config.max_sockets == 0 {
            return Err(HttpError::ConfigError(
                "max_sockets must be greater than 0".to_string(),
            ));
        }

        let mut builder = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .pool_max_idle_per_host(config.max_sockets)
            .pool_idle_timeout(config.idle_timeout);
        builder = if config.keep_alive {
            builder.tcp_keepalive(Duration::from_secs(60))
        } else {
            builder.pool_max_idle_per_host(0)
        };
        let client = builder.build()?;

        Ok(Self {
            offline: false,
            mocks: HashMap::new(),
            permits: Arc::new(Semaphore::new(config.max_sockets)),
            config,
            client,
        })
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Set offline mode
    pub fn set_offline(&mut self) {
        self.offline = true;
        debug!("HttpManager set to offline mode");
    }

    /// Set online mode
    pub fn set_online(&mut self) {
        self.offline = false;
        debug!("HttpManager set to online mode");
    }

    /// Add a single mock response, keyed by URL
    pub fn add_mock(&mut self, url: &str, response: JsonValue) {
        self.mocks.insert(url.to_string(), response);
        debug!("Added HTTP mock for {}", url);
    }

    /// Clear all mocks
    pub fn clear_mocks(&mut self) {
        self.mocks.clear();
        debug!("Cleared all HTTP mocks");
    }

    fn mock_response(&self, url: &str) -> Result<HttpResponse, HttpError> {
        let body = self.mocks.get(url).or_else(|| {
            // Partial matches, longest mock URL first
            let mut candidates: Vec<_> = self
                .mocks
                .iter()
                .filter(|(mock_url, _)| url.contains(mock_url.as_str()))
                .collect();
            candidates.sort_by_key(|(mock_url, _)| std::cmp::Reverse(mock_url.len()));
            candidates.first().map(|(_, body)| *body)
        });

        match body {
            Some(body) => {
                debug!("Found mock response for {}", url);
                Ok(HttpResponse {
                    status: 200,
                    body: body.clone(),
                    elapsed: Duration::ZERO,
                })
            }
            None => Err(HttpError::NoMock(url.to_string())),
        }
    }
}

#[async_trait::async_trait]
impl HttpClient for HttpManager {
    async fn post_form(
        &self,
        url: &str,
        body: Option<&JsonValue>,
    ) -> Result<HttpResponse, HttpError> {
        if self.offline {
            return self.mock_response(url);
        }

        let parsed = reqwest::Url::parse(url)
            .map_err(|e| HttpError::InvalidUrl(format!("{url}: {e}")))?;
        let pairs = match body {
            Some(body) => form_pairs(body)?,
            None => Vec::new(),
        };

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| HttpError::ConfigError("connection limiter closed".to_string()))?;

        let started = Instant::now();
        let response = self.client.post(parsed).form(&pairs).send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        let elapsed = started.elapsed();

        info!(
            url = %url,
            status,
            duration_ms = elapsed.as_millis() as u64,
            "OutboundCall"
        );

        let body = match serde_json::from_str::<JsonValue>(&text) {
            Ok(json) => json,
            Err(_) => {
                if !text.is_empty() {
                    warn!(url = %url, "Response is not JSON, keeping raw text");
                }
                JsonValue::String(text)
            }
        };

        Ok(HttpResponse {
            status,
            body,
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::{Form, Json, Router};
    use serde_json::json;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_post_form_round_trip() {
        let router = Router::new().route(
            "/login3",
            post(|Form(form): Form<HashMap<String, String>>| async move {
                Json(json!({
                    "playerName": form.get("email").cloned().unwrap_or_default(),
                    "sessionToken": "tok"
                }))
            }),
        );
        let base = serve(router).await;

        let manager = HttpManager::new().unwrap();
        let response = manager
            .post_form(
                &format!("{base}/login3"),
                Some(&json!({ "email": "email1@example.com", "password": "letmein1" })),
            )
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert!(response.is_success());
        assert_eq!(response.body["playerName"], "email1@example.com");
        assert_eq!(response.body["sessionToken"], "tok");
    }

    #[tokio::test]
    async fn test_non_json_body_is_kept_as_text() {
        let router = Router::new().route("/platformMOTD", post(|| async { "Welcome!" }));
        let base = serve(router).await;

        let manager = HttpManager::new().unwrap();
        let response = manager
            .post_form(&format!("{base}/platformMOTD"), None)
            .await
            .unwrap();
        assert_eq!(response.body, json!("Welcome!"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let manager = HttpManager::new().unwrap();
        let err = manager
            .post_form(&format!("http://{addr}/run"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::NetworkError(_)));
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let manager = HttpManager::new().unwrap();
        let err = manager.post_form("not a url", None).await.unwrap_err();
        assert!(matches!(err, HttpError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_offline_mocks() {
        let mut manager = HttpManager::new().unwrap();
        manager.set_offline();
        manager.add_mock("http://lobbies/v1/listGames", json!([]));
        manager.add_mock("http://lobbies/v1", json!({ "fallback": true }));

        let exact = manager
            .post_form("http://lobbies/v1/listGames", None)
            .await
            .unwrap();
        assert_eq!(exact.body, json!([]));

        let partial = manager
            .post_form("http://lobbies/v1/hostGame", None)
            .await
            .unwrap();
        assert_eq!(partial.body, json!({ "fallback": true }));

        let missing = manager.post_form("http://stats/v1/getPlayerStats", None).await;
        assert!(matches!(missing, Err(HttpError::NoMock(_))));
    }
}
