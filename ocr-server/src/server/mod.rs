//! Listener supervision.
//!
//! [`ServerSupervisor`] owns the HTTP listener: it binds it, shuts it down
//! gracefully, and brings it back after an unexpected exit. Transitions are
//! published as [`ServerEvent`]s and through a watchable [`ServerState`].

mod state;
mod supervisor;

pub use state::{
    ServerEvent, ServerState, STATUS_CRASH_RESTARTING, STATUS_RESTARTING, STATUS_RUNNING,
    STATUS_STARTING, STATUS_START_FAILED, STATUS_STOPPED,
};
pub use supervisor::{OnStopped, ServerSupervisor};
