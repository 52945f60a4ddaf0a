//! Ramp scheduler: one run of a fixed roster
//!
//! Timeline of a run of length `duration` with ramp window `ramp`:
//!
//! ```text
//! 0 ── warmup ── starts spread over ramp ── ... ── stops spread over ramp ── warmup ── duration
//! ```
//!
//! Player `i` of `n` starts at `warmup + i * ramp / n` and its stop begins at
//! `duration - ramp - warmup + i * ramp / n`. The report fires at `duration`.

use crate::report::log_reports;
use parking_lot::Mutex;
use skirmish_config::TimingConfig;
use skirmish_player::{Player, PlayerDriver};
use skirmish_timers::{TimerHandle, TimerTask, Timers};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info};

/// Receives the end-of-run notification
pub trait RunnerCleanup: Send + Sync {
    fn runner_finished(&self, run_id: u64);
}

/// Timing of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPlan {
    pub duration: Duration,
    pub ramp: Duration,
    /// Delay before the first start, also kept free before `duration`
    pub warmup: Duration,
    /// Delay before the stop ramp after an explicit stop
    pub settle: Duration,
}

impl RunPlan {
    pub fn new(duration: Duration, ramp: Duration, timing: &TimingConfig) -> Self {
        Self {
            duration,
            ramp,
            warmup: timing.ramp_warmup,
            settle: timing.stop_settle,
        }
    }

    /// When the stop ramp begins; clamps at zero for runs shorter than their ramps
    pub fn ramp_down_at(&self) -> Duration {
        self.duration
            .saturating_sub(self.ramp)
            .saturating_sub(self.warmup)
    }
}

/// Offset of player `index` of `count` inside a ramp window
///
/// Computed in whole nanoseconds so offsets are non-decreasing in `index`.
pub fn ramp_offset(index: usize, count: usize, ramp: Duration) -> Duration {
    if count == 0 {
        return Duration::ZERO;
    }
    let nanos = ramp.as_nanos() * index as u128 / count as u128;
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ramp {
    Up,
    Down,
}

pub struct RampScheduler {
    run_id: u64,
    players: Vec<Arc<Player>>,
    plan: RunPlan,
    timers: Arc<dyn Timers>,
    driver: Arc<dyn PlayerDriver>,
    owner: Weak<dyn RunnerCleanup>,
    /// Every timer this run has armed; cancelled together on stop
    handles: Mutex<Vec<TimerHandle>>,
    stopping: AtomicBool,
    finished: AtomicBool,
}

impl RampScheduler {
    pub fn new(
        run_id: u64,
        players: Vec<Arc<Player>>,
        plan: RunPlan,
        timers: Arc<dyn Timers>,
        driver: Arc<dyn PlayerDriver>,
        owner: Weak<dyn RunnerCleanup>,
    ) -> Arc<Self> {
        Arc::new(Self {
            run_id,
            players,
            plan,
            timers,
            driver,
            owner,
            handles: Mutex::new(Vec::new()),
            stopping: AtomicBool::new(false),
            finished: AtomicBool::new(false),
        })
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn players(&self) -> &[Arc<Player>] {
        &self.players
    }

    pub fn plan(&self) -> &RunPlan {
        &self.plan
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Arm the ramp-up, ramp-down and finish timers
    pub fn run(self: &Arc<Self>) {
        info!(
            run_id = self.run_id,
            players = self.players.len(),
            duration_ms = self.plan.duration.as_millis() as u64,
            ramp_ms = self.plan.ramp.as_millis() as u64,
            "Running load test"
        );

        let mut handles = self.handles.lock();
        if self.is_stopping() {
            return;
        }
        handles.push(self.after(self.plan.warmup, |scheduler| {
            scheduler.schedule_ramp(Ramp::Up, false);
        }));
        handles.push(self.after(self.plan.ramp_down_at(), |scheduler| {
            scheduler.schedule_ramp(Ramp::Down, false);
        }));
        handles.push(self.after(self.plan.duration, |scheduler| scheduler.finish()));
    }

    /// End the run early, still winding players down over the ramp window
    ///
    /// Every pending timer of the run is cancelled first, so nothing armed by
    /// [`RampScheduler::run`] fires afterwards. The finish notification is
    /// sent after `ramp + settle` without waiting for the stops to complete.
    /// Calling it again, or after the run finished, has no effect.
    pub fn stop(self: &Arc<Self>) {
        let mut handles = self.handles.lock();
        if self.is_finished() || self.stopping.swap(true, Ordering::SeqCst) {
            debug!(run_id = self.run_id, "Run already stopping or finished");
            return;
        }
        info!(run_id = self.run_id, "Stopping load test run");

        for handle in handles.drain(..) {
            handle.cancel();
        }
        handles.push(self.after(self.plan.settle, |scheduler| {
            scheduler.schedule_ramp(Ramp::Down, true);
        }));
        handles.push(self.after(
            self.plan.ramp.saturating_add(self.plan.settle),
            |scheduler| scheduler.finish(),
        ));
    }

    fn after<F>(self: &Arc<Self>, delay: Duration, action: F) -> TimerHandle
    where
        F: FnOnce(Arc<Self>) + Send + 'static,
    {
        let scheduler = self.clone();
        self.timers
            .schedule(delay, Box::pin(async move { action(scheduler) }))
    }

    /// Arm one start or stop timer per player across the ramp window
    fn schedule_ramp(self: &Arc<Self>, ramp: Ramp, from_stop: bool) {
        let mut handles = self.handles.lock();
        if self.is_stopping() && !from_stop {
            return;
        }
        debug!(run_id = self.run_id, ramp = ?ramp, "Scheduling ramp");

        let count = self.players.len();
        for (index, player) in self.players.iter().enumerate() {
            let delay = ramp_offset(index, count, self.plan.ramp);
            let driver = self.driver.clone();
            let player = player.clone();
            let task: TimerTask = match ramp {
                Ramp::Up => Box::pin(async move { driver.start(player).await }),
                Ramp::Down => Box::pin(async move { driver.stop(player).await }),
            };
            handles.push(self.timers.schedule(delay, task));
        }
    }

    /// Report, drop whatever is still armed and notify the owner once
    fn finish(&self) {
        if self.finished.swap(true, Ordering::SeqCst) {
            return;
        }
        for handle in self.handles.lock().drain(..) {
            handle.cancel();
        }
        log_reports(&self.players);
        info!(run_id = self.run_id, "Finished load test");
        if let Some(owner) = self.owner.upgrade() {
            owner.runner_finished(self.run_id);
        }
    }
}
