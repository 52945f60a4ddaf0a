//! Timer capability interface

use futures::future::BoxFuture;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Work run when a timer fires
pub type TimerTask = BoxFuture<'static, ()>;

/// Abstract one-shot timer service
pub trait Timers: Send + Sync {
    /// Run `task` once after `delay` unless the returned handle is cancelled first
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle;
}

/// Handle to a scheduled timer
///
/// Cancelling before the timer fires guarantees the task never starts.
/// Cancelling afterwards is a no-op; a task that is already running is not
/// interrupted.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    token: CancellationToken,
}

impl TimerHandle {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
