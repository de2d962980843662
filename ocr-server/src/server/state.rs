use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub const STATUS_STOPPED: &str = "server stopped";
pub const STATUS_STARTING: &str = "server starting...";
pub const STATUS_RUNNING: &str = "server is running";
pub const STATUS_CRASH_RESTARTING: &str = "server stopped - restarting...";
pub const STATUS_RESTARTING: &str = "server restarting...";
pub const STATUS_START_FAILED: &str = "unable to start the server";

/// Listener lifecycle state. `Stopped` is initial; every state can be left
/// with an explicit `start()` or `stop()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ServerState {
    Stopped,
    Starting,
    Running,
    Restarting,
    Failed,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerState::Stopped => "stopped",
            ServerState::Starting => "starting",
            ServerState::Running => "running",
            ServerState::Restarting => "restarting",
            ServerState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One state transition, as broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerEvent {
    pub state: ServerState,
    pub status: String,
    pub at: DateTime<Utc>,
}

impl ServerEvent {
    pub fn new(state: ServerState, status: impl Into<String>) -> Self {
        Self {
            state,
            status: status.into(),
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_state_name() {
        let event = ServerEvent::new(ServerState::Running, STATUS_RUNNING);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["state"], "Running");
        assert_eq!(value["status"], "server is running");
        assert!(value["at"].is_string());
    }
}
