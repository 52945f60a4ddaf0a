//! Logging infrastructure for skirmish
//!
//! Everything logs through `tracing`; this crate only owns subscriber
//! installation and a couple of process-level hooks.

pub mod init;
pub mod panic;

pub use init::{init_logging, init_simple_tracing, log_effective_config};
pub use panic::install_panic_logger;
