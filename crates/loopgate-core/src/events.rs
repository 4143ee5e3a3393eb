//! Server lifecycle states and broadcast event streams

use serde::Serialize;
use tokio::sync::broadcast;

/// Lifecycle state of the embedded server.
///
/// The lifecycle manager is the only component that mutates this; everyone
/// else observes transitions through the status stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerState {
    /// No listener exists
    #[default]
    Stopped,
    /// A start attempt is in flight
    Starting,
    /// Listener is bound and serving
    Running,
    /// A stop is in flight
    Stopping,
    /// A start, stop, or health check failed; a fresh start is required
    Error,
}

impl ServerState {
    pub fn is_running(self) -> bool {
        matches!(self, ServerState::Running)
    }

    /// Whether a duplicate lifecycle call in the same direction should
    /// no-op rather than start a second attempt.
    pub fn is_transitional(self) -> bool {
        matches!(self, ServerState::Starting | ServerState::Stopping)
    }

    pub fn label(self) -> &'static str {
        match self {
            ServerState::Stopped => "stopped",
            ServerState::Starting => "starting",
            ServerState::Running => "running",
            ServerState::Stopping => "stopping",
            ServerState::Error => "error",
        }
    }
}

impl std::fmt::Display for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Broadcast channel capacity for status and log streams.
///
/// Slow subscribers lag and drop the oldest entries rather than ever
/// blocking the publisher.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// The status and diagnostic-log streams owned by the lifecycle manager.
///
/// Both are multi-subscriber broadcast channels: subscribers attach and
/// detach freely, receive events emitted after they attach (no replay),
/// and see status transitions in the exact order they occurred.
pub struct ServerEvents {
    status_tx: broadcast::Sender<ServerState>,
    log_tx: broadcast::Sender<String>,
}

impl ServerEvents {
    pub fn new() -> Self {
        let (status_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (log_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { status_tx, log_tx }
    }

    /// Subscribe to server state transitions.
    pub fn subscribe_status(&self) -> broadcast::Receiver<ServerState> {
        self.status_tx.subscribe()
    }

    /// Subscribe to free-text diagnostic log lines.
    pub fn subscribe_logs(&self) -> broadcast::Receiver<String> {
        self.log_tx.subscribe()
    }

    /// Emit a state transition to all current subscribers.
    pub fn emit_status(&self, state: ServerState) {
        // Ignore send errors (no subscribers is fine)
        let _ = self.status_tx.send(state);
    }

    /// Emit a diagnostic log line to all current subscribers.
    pub fn emit_log(&self, line: impl Into<String>) {
        let _ = self.log_tx.send(line.into());
    }
}

impl Default for ServerEvents {
    fn default() -> Self {
        Self::new()
    }
}
