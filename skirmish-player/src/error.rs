use crate::phase::Phase;
use skirmish_http::HttpError;
use skirmish_relay::RelayError;

/// Why a player step failed
///
/// [`PlayerError::Cancelled`] is the only cancellation signal; every other
/// variant is an operational error that costs the player its current loop.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("player was asked to exit")]
    Cancelled,

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("request to {url} failed: {message}")]
    Backend { url: String, message: String },

    #[error("invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("unexpected outcome {outcome} while {phase}")]
    UnexpectedOutcome { phase: Phase, outcome: String },
}

impl PlayerError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, PlayerError::Cancelled)
    }

    pub(crate) fn invalid(url: &str, message: impl Into<String>) -> Self {
        PlayerError::InvalidResponse {
            url: url.to_string(),
            message: message.into(),
        }
    }
}
