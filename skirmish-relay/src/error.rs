use std::time::Duration;

/// Errors surfaced to code waiting on a relay socket
///
/// Cloneable because one connection failure is fanned out to every waiter
/// registered at that moment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("failed to connect to {peer}: {message}")]
    Connect { peer: String, message: String },

    #[error("relay socket error: {0}")]
    Io(String),

    #[error("relay socket closed")]
    Closed,

    #[error("no matching frame within {0:?}")]
    Timeout(Duration),
}
