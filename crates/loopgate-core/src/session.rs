//! Session snapshot contract for the external persistence collaborator
//!
//! The core never writes to disk itself; the embedding application supplies
//! a [`SessionStore`]. The lifecycle manager only consumes snapshots to
//! decide whether to auto-resume a previous run.

use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::Result;

/// Snapshots older than this are ignored on auto-resume.
pub const SESSION_MAX_AGE_HOURS: i64 = 24;

/// What was on screen when the application was last backgrounded or closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub was_server_running: bool,
    pub was_webview_visible: bool,
    pub last_url: Option<String>,
    pub timestamp: DateTime<Local>,
}

impl SessionSnapshot {
    /// Snapshot of the current moment.
    pub fn now(was_server_running: bool, was_webview_visible: bool, last_url: Option<String>) -> Self {
        Self {
            was_server_running,
            was_webview_visible,
            last_url,
            timestamp: Local::now(),
        }
    }

    /// A snapshot past the 24-hour cutoff is not worth resuming.
    pub fn is_stale(&self) -> bool {
        Local::now() - self.timestamp > Duration::hours(SESSION_MAX_AGE_HOURS)
    }
}

/// Async persistence contract implemented by the embedding application.
#[trait_variant::make(SessionStore: Send)]
pub trait LocalSessionStore {
    /// Load the last saved snapshot, if any.
    async fn load(&self) -> Result<Option<SessionSnapshot>>;

    /// Persist a snapshot, replacing any previous one.
    async fn save(&self, snapshot: &SessionSnapshot) -> Result<()>;
}

/// In-memory store, mirroring the persistence stub the mobile shell ships
/// with. Useful for tests and the headless runner.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: RwLock<Option<SessionSnapshot>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<SessionSnapshot>> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        *self.inner.write().await = Some(snapshot.clone());
        Ok(())
    }
}
