//! Virtual-clock implementation of the Timers trait

use crate::interface::{TimerHandle, TimerTask, Timers};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct Entry {
    token: CancellationToken,
    task: TimerTask,
}

#[derive(Default)]
struct ClockState {
    now: Duration,
    seq: u64,
    /// Keyed by (due time, scheduling order)
    queue: BTreeMap<(Duration, u64), Entry>,
}

/// Timers driven by an explicit virtual clock
///
/// Nothing fires until [`ManualTimers::advance`] is awaited. Due tasks run
/// inline, one at a time, in due-time order with ties broken by scheduling
/// order; timers scheduled by a running task are honoured within the same
/// advance if they fall inside it.
#[derive(Default)]
pub struct ManualTimers {
    state: Mutex<ClockState>,
}

impl ManualTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time, measured from construction
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Due times of timers that are neither fired nor cancelled
    pub fn pending(&self) -> Vec<Duration> {
        self.state
            .lock()
            .queue
            .iter()
            .filter(|(_, entry)| !entry.token.is_cancelled())
            .map(|((due, _), _)| *due)
            .collect()
    }

    /// Move the clock forward by `by`, firing everything that falls due
    pub async fn advance(&self, by: Duration) {
        let target = self.now() + by;
        while let Some(task) = self.pop_due(Some(target)) {
            task.await;
        }
        let mut state = self.state.lock();
        if state.now < target {
            state.now = target;
        }
    }

    /// Fire every pending timer, however far in the future, until none remain
    pub async fn run_until_idle(&self) {
        while let Some(task) = self.pop_due(None) {
            task.await;
        }
    }

    fn pop_due(&self, limit: Option<Duration>) -> Option<TimerTask> {
        let mut state = self.state.lock();
        loop {
            let key = *state.queue.keys().next()?;
            if limit.is_some_and(|limit| key.0 > limit) {
                return None;
            }
            let entry = state.queue.remove(&key)?;
            if entry.token.is_cancelled() {
                continue;
            }
            if state.now < key.0 {
                state.now = key.0;
            }
            return Some(entry.task);
        }
    }
}

impl Timers for ManualTimers {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        let token = CancellationToken::new();
        let mut state = self.state.lock();
        state.seq += 1;
        let key = (state.now + delay, state.seq);
        state.queue.insert(
            key,
            Entry {
                token: token.clone(),
                task,
            },
        );
        TimerHandle::new(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn recorder(
        timers: &Arc<ManualTimers>,
        log: &Arc<Mutex<Vec<(Duration, &'static str)>>>,
        label: &'static str,
    ) -> TimerTask {
        let timers = timers.clone();
        let log = log.clone();
        Box::pin(async move {
            log.lock().push((timers.now(), label));
        })
    }

    #[tokio::test]
    async fn test_fires_in_due_order() {
        let timers = Arc::new(ManualTimers::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        timers.schedule(Duration::from_millis(300), recorder(&timers, &log, "c"));
        timers.schedule(Duration::from_millis(100), recorder(&timers, &log, "a"));
        timers.schedule(Duration::from_millis(100), recorder(&timers, &log, "b"));

        timers.advance(Duration::from_millis(200)).await;
        assert_eq!(
            *log.lock(),
            vec![
                (Duration::from_millis(100), "a"),
                (Duration::from_millis(100), "b")
            ]
        );
        assert_eq!(timers.now(), Duration::from_millis(200));
        assert_eq!(timers.pending(), vec![Duration::from_millis(300)]);

        timers.advance(Duration::from_millis(100)).await;
        assert_eq!(log.lock().len(), 3);
        assert!(timers.pending().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_timer_never_runs() {
        let timers = Arc::new(ManualTimers::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        let handle = timers.schedule(Duration::from_millis(10), recorder(&timers, &log, "x"));
        handle.cancel();

        timers.advance(Duration::from_secs(1)).await;
        assert!(log.lock().is_empty());
        assert!(timers.pending().is_empty());
    }

    #[tokio::test]
    async fn test_nested_schedule_within_same_advance() {
        let timers = Arc::new(ManualTimers::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        let inner_timers = timers.clone();
        let inner_log = log.clone();
        timers.schedule(
            Duration::from_millis(100),
            Box::pin(async move {
                let task = recorder(&inner_timers, &inner_log, "nested");
                inner_timers.schedule(Duration::from_millis(50), task);
            }),
        );

        timers.advance(Duration::from_millis(200)).await;
        assert_eq!(*log.lock(), vec![(Duration::from_millis(150), "nested")]);
    }

    #[tokio::test]
    async fn test_run_until_idle() {
        let timers = Arc::new(ManualTimers::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        timers.schedule(Duration::from_secs(3600), recorder(&timers, &log, "late"));
        timers.run_until_idle().await;

        assert_eq!(*log.lock(), vec![(Duration::from_secs(3600), "late")]);
    }
}
