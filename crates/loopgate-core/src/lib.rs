//! # loopgate-core - Core Domain Types
//!
//! Foundation crate for loopgate. Provides the server state model, the
//! error taxonomy and error bus, broadcast event streams, configuration,
//! and the session-snapshot contract.
//!
//! This crate has **zero internal dependencies** -- it only depends on
//! external crates (tokio, serde, chrono, thiserror, tracing).
//!
//! ## Public API
//!
//! ### Events (`events`)
//! - [`ServerState`] - Lifecycle state (Stopped, Starting, Running, Stopping, Error)
//! - [`ServerEvents`] - Status and diagnostic-log broadcast streams
//!
//! ### Error Handling (`error`)
//! - [`Error`] / [`Result`] - Internal fallible-operation type
//! - [`AppError`] - Reportable value: kind, severity, message, timestamps
//! - [`ErrorKind`] / [`Severity`] - Closed taxonomy with presentation tables
//!
//! ### Error Bus (`bus`)
//! - [`ErrorBus`] - Broadcast fan-out of [`AppError`] with severity-mapped logging
//!
//! ### Configuration (`config`)
//! - [`AllowListConfig`] - Compiled-in navigation allow-list
//! - [`Settings`] / [`load_settings()`] - Optional `.loopgate/config.toml`
//!
//! ### Session (`session`)
//! - [`SessionSnapshot`] - Last-run state with a 24-hour staleness cutoff
//! - [`SessionStore`] - Async persistence contract (external collaborator)
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use loopgate_core::prelude::*;
//! ```

pub mod bus;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod session;

/// Prelude for common imports used throughout all loopgate crates
pub mod prelude {
    pub use super::error::{Error, Result};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use bus::ErrorBus;
pub use config::{
    load_settings, parse_settings, AllowListConfig, HealthSettings, ServerSettings, Settings,
    DEFAULT_HEALTH_INTERVAL_SECS, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_RESTART_DELAY_MS,
};
pub use error::{AppError, Error, ErrorKind, Result, Severity};
pub use events::{ServerEvents, ServerState};
pub use session::{
    MemorySessionStore, SessionSnapshot, SessionStore, SESSION_MAX_AGE_HOURS,
};
