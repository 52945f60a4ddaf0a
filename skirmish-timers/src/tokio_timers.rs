//! tokio-backed implementation of the Timers trait

use crate::interface::{TimerHandle, TimerTask, Timers};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Timers backed by spawned tasks and `tokio::time::sleep`
///
/// Must be used from inside a tokio runtime. Under a paused test clock the
/// timers follow `tokio::time::advance`.
#[derive(Debug, Clone, Default)]
pub struct TokioTimers;

impl TokioTimers {
    pub fn new() -> Self {
        Self
    }
}

impl Timers for TokioTimers {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        let token = CancellationToken::new();
        let cancelled = token.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancelled.cancelled() => {
                    tracing::trace!("Timer cancelled before firing");
                }
                _ = tokio::time::sleep(delay) => task.await,
            }
        });

        TimerHandle::new(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let timers = TokioTimers::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = fired.clone();
        let _handle = timers.schedule(
            Duration::from_secs(5),
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        tokio::time::sleep(Duration::from_millis(4_999)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_fire() {
        let timers = TokioTimers::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = fired.clone();
        let handle = timers.schedule(
            Duration::from_secs(1),
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        handle.cancel();
        assert!(handle.is_cancelled());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
