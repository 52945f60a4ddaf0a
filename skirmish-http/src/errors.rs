//! HTTP error types

/// Error type for HTTP operations
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid form body: {0}")]
    InvalidBody(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("No mock response for {0}")]
    NoMock(String),
}
