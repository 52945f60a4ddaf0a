//! Administrative HTTP surface of a skirmish node
//!
//! Every node serves the same four routes. `/admin/start` and `/admin/stop`
//! fan a run out to the whole cluster; `/run` and `/stopRun` act on this
//! node only.

pub mod app;
pub mod errors;
pub mod handlers;
pub mod startup;

pub use app::{create_app, AppState};
pub use errors::{ServerError, ServerResult};
pub use startup::Server;
