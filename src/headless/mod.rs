//! Headless mode - JSON event output for embedding and scripting
//!
//! The binary is the stand-in for the UI collaborator: it subscribes to the
//! status, log, and error streams and prints structured JSON events to
//! stdout so scripts (and E2E tests) can parse them reliably.
//!
//! # Event Format
//!
//! Events are output as NDJSON (newline-delimited JSON), one event per line.
//! Each event has an "event" field indicating its type, along with
//! event-specific data.
//!
//! # Example Output
//!
//! ```json
//! {"event":"status","state":"running","timestamp":1704700001000}
//! {"event":"log","line":"GET /api/status -> 200","timestamp":1704700002000}
//! {"event":"error","kind":"port-in-use","severity":"high","message":"Port 3000 is already in use","friendly":"Another application is using the server port.","actions":["Stop other apps that may be using the port","Restart the device","Use a different port"],"timestamp":1704700003000}
//! ```

pub mod runner;

use chrono::Utc;
use serde::Serialize;
use std::io::{self, Write};
use tracing::error;

use loopgate_core::{AppError, ServerState};

/// Events emitted in headless mode
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HeadlessEvent {
    /// Server state transition
    Status { state: ServerState, timestamp: i64 },

    /// Diagnostic log line (request log, lifecycle notes)
    Log { line: String, timestamp: i64 },

    /// Reported error with its presentation mapping
    Error {
        kind: String,
        severity: String,
        message: String,
        friendly: String,
        actions: Vec<String>,
        timestamp: i64,
    },

    /// Where the live listener is reachable
    ServerUrl { url: String, timestamp: i64 },

    /// Navigation verdicts for a target URL
    Navigation {
        url: String,
        user_initiated_verdict: String,
        automatic_verdict: String,
        block_reason: String,
        timestamp: i64,
    },

    /// Result of an on-demand health probe
    Health { healthy: bool, timestamp: i64 },
}

impl HeadlessEvent {
    /// Emit this event to stdout as JSON
    pub fn emit(&self) {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize headless event: {}", e);
                return;
            }
        };

        // Write to stdout with newline (NDJSON format)
        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", json) {
            error!("Failed to write headless event to stdout: {}", e);
            return;
        }

        // Flush to ensure immediate output
        if let Err(e) = stdout.flush() {
            error!("Failed to flush headless stdout: {}", e);
        }
    }

    /// Get current timestamp in milliseconds
    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    // ─────────────────────────────────────────────────────────
    // Convenience constructors
    // ─────────────────────────────────────────────────────────

    pub fn status(state: ServerState) -> Self {
        Self::Status {
            state,
            timestamp: Self::now(),
        }
    }

    pub fn log(line: String) -> Self {
        Self::Log {
            line,
            timestamp: Self::now(),
        }
    }

    pub fn from_error(err: &AppError) -> Self {
        Self::Error {
            kind: err.kind.label().to_string(),
            severity: err.severity.label().to_string(),
            message: err.message.clone(),
            friendly: err.friendly_message().to_string(),
            actions: err
                .suggested_actions()
                .iter()
                .map(|a| a.to_string())
                .collect(),
            timestamp: Self::now(),
        }
    }

    pub fn server_url(url: &str) -> Self {
        Self::ServerUrl {
            url: url.to_string(),
            timestamp: Self::now(),
        }
    }

    pub fn health(healthy: bool) -> Self {
        Self::Health {
            healthy,
            timestamp: Self::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loopgate_core::AppError;

    #[test]
    fn test_status_event_serialization() {
        let event = HeadlessEvent::status(ServerState::Running);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"status\""));
        assert!(json.contains("\"state\":\"running\""));
    }

    #[test]
    fn test_error_event_carries_presentation_mapping() {
        let event = HeadlessEvent::from_error(&AppError::port_in_use(3000));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"port-in-use\""));
        assert!(json.contains("\"severity\":\"high\""));
        assert!(json.contains("Stop other apps"));
    }
}
