//! Error bus - broadcast fan-out of reported errors
//!
//! Decouples error producers (the lifecycle manager, the health loop) from
//! error presentation (the UI layer). Publishing never blocks and never
//! fails: a slow subscriber lags and loses the oldest entries, a missing
//! subscriber is simply not delivered to.

use std::sync::Mutex;

use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::error::{AppError, Severity};

const BUS_CHANNEL_CAPACITY: usize = 256;

/// Broadcast channel of [`AppError`] values with severity-mapped logging.
///
/// One instance per process, constructed at the composition root and handed
/// to collaborators by `Arc`.
pub struct ErrorBus {
    tx: Mutex<Option<broadcast::Sender<AppError>>>,
}

impl ErrorBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CHANNEL_CAPACITY);
        Self {
            tx: Mutex::new(Some(tx)),
        }
    }

    /// Report an error: write a structured log entry at the level derived
    /// from its severity, then fan out to current subscribers.
    ///
    /// Never fails. Reporting on a closed bus still logs.
    pub fn report(&self, err: AppError) {
        match err.severity {
            Severity::Low => info!(kind = err.kind.label(), "{}", err.message),
            Severity::Medium => warn!(kind = err.kind.label(), "{}", err.message),
            Severity::High | Severity::Critical => {
                error!(kind = err.kind.label(), "{}", err.message)
            }
        }

        let guard = self.tx.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(tx) = guard.as_ref() {
            // Ignore send errors (no subscribers is fine)
            let _ = tx.send(err);
        }
    }

    /// Attach a subscriber. Late subscribers see only errors reported after
    /// they attach; subscribing to a closed bus yields a receiver that
    /// reports the channel as closed.
    pub fn subscribe(&self) -> broadcast::Receiver<AppError> {
        let guard = self.tx.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match guard.as_ref() {
            Some(tx) => tx.subscribe(),
            None => {
                let (tx, rx) = broadcast::channel(1);
                drop(tx);
                rx
            }
        }
    }

    /// Close the bus. Idempotent; subsequent reports only log.
    pub fn close(&self) {
        let mut guard = self.tx.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.take();
    }

    pub fn is_closed(&self) -> bool {
        let guard = self.tx.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.is_none()
    }
}

impl Default for ErrorBus {
    fn default() -> Self {
        Self::new()
    }
}
