//! Cancellable timers for skirmish
//!
//! Everything time-driven in a run (player starts and stops, loop
//! reschedules, the end-of-run notification) goes through the [`Timers`]
//! capability so tests can swap the tokio clock for [`ManualTimers`] and step
//! simulated time deterministically.

pub mod interface;
pub mod manual;
pub mod tokio_timers;

pub use interface::{TimerHandle, TimerTask, Timers};
pub use manual::ManualTimers;
pub use tokio_timers::TokioTimers;
