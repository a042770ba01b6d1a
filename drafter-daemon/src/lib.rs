//! Watcher runtime: notify events feed a debounced scheduler that runs cycles,
//! and the latest outcome is served over HTTP.

mod error;
pub mod log_rotation;
pub mod logging;
mod runtime;
pub mod scheduler;
pub mod status;
pub mod watcher;

pub use error::DaemonError;
pub use runtime::{run, start_blocking};
pub use scheduler::{Scheduler, SchedulerConfig};
pub use status::StatusStore;
