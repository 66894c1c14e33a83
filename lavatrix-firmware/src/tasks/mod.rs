//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals.

pub mod indicator;
pub mod monitor;
pub mod status;

pub use indicator::indicator_task;
pub use monitor::monitor_task;
pub use status::status_task;
