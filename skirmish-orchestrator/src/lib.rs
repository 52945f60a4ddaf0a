//! Run orchestration for skirmish
//!
//! A node executes at most one run at a time. The [`Coordinator`] validates
//! administrative requests, fans cluster-wide starts and stops out to every
//! worker node, and on each node owns the single run slot. A run is a
//! [`RampScheduler`] walking a generated roster through a staggered start,
//! a staggered stop and a final report.

pub mod coordinator;
pub mod error;
pub mod report;
pub mod request;
pub mod roster;
pub mod scheduler;

pub use coordinator::Coordinator;
pub use error::OrchestratorError;
pub use report::{load_test_report, LoadTestReport};
pub use request::{RunForm, RunRequest, RunResponse, MAX_NUM_PLAYERS};
pub use roster::RosterGenerator;
pub use scheduler::{ramp_offset, RampScheduler, RunPlan, RunnerCleanup};
