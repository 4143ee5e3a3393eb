//! Application error types with severity-based reporting

use chrono::{DateTime, Local};
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Internal error type for fallible operations.
///
/// These are the errors that flow through `Result` returns inside the crate.
/// At operation boundaries (start/stop/health-check) they are converted into
/// an [`AppError`] via [`Error::to_app_error`] and reported on the error bus;
/// they never escape as uncaught faults.
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ─────────────────────────────────────────────────────────────
    // Server Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to bind listener: {reason}")]
    Bind { reason: String },

    #[error("Port {port} is already in use")]
    PortInUse { port: u16 },

    #[error("Health probe error: {message}")]
    Probe { message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl Error {
    pub fn probe(message: impl Into<String>) -> Self {
        Self::Probe {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Classify a listener bind failure, distinguishing an occupied port
    /// from other startup failures.
    pub fn from_bind_error(err: std::io::Error, port: u16) -> Self {
        if err.kind() == std::io::ErrorKind::AddrInUse {
            Self::PortInUse { port }
        } else {
            Self::Bind {
                reason: err.to_string(),
            }
        }
    }

    /// Convert into the reportable taxonomy for the error bus.
    pub fn to_app_error(&self) -> AppError {
        match self {
            Error::PortInUse { port } => AppError::port_in_use(*port),
            Error::Bind { reason } => AppError::server_startup(reason.clone()),
            Error::Io(e) => AppError::server_startup(e.to_string()),
            Error::Probe { message } => AppError::server_connection(message.clone()),
            Error::Config { message } => AppError::unknown(message.clone()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Reportable Error Taxonomy
// ─────────────────────────────────────────────────────────────────

/// Error categories surfaced to the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Listener bind or startup failure
    ServerStartup,
    /// Post-start health failure
    ServerConnection,
    /// Embedded-view rendering failure (owned by the UI collaborator)
    WebViewLoad,
    /// Network operation timed out
    NetworkTimeout,
    /// Bind failed because the OS reported address-in-use
    PortInUse,
    /// Catch-all
    Unknown,
}

/// Severity of a reported error. Presentation-only: it drives the log level
/// and UI treatment, never propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl ErrorKind {
    /// Policy default severity for this kind. Not user-configurable.
    pub fn default_severity(self) -> Severity {
        match self {
            ErrorKind::ServerStartup => Severity::High,
            ErrorKind::ServerConnection => Severity::Medium,
            ErrorKind::WebViewLoad => Severity::Medium,
            ErrorKind::NetworkTimeout => Severity::Medium,
            ErrorKind::PortInUse => Severity::High,
            ErrorKind::Unknown => Severity::Medium,
        }
    }

    /// Short label used in log lines and headless output.
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::ServerStartup => "server-startup",
            ErrorKind::ServerConnection => "server-connection",
            ErrorKind::WebViewLoad => "webview-load",
            ErrorKind::NetworkTimeout => "network-timeout",
            ErrorKind::PortInUse => "port-in-use",
            ErrorKind::Unknown => "unknown",
        }
    }
}

/// An immutable reported error value carried on the error bus.
#[derive(Debug, Clone)]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub message: String,
    pub details: Option<String>,
    pub cause: Option<String>,
    pub created_at: DateTime<Local>,
}

impl AppError {
    /// Create an error with the kind's default severity.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            details: None,
            cause: None,
            created_at: Local::now(),
        }
    }

    pub fn server_startup(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServerStartup, message)
    }

    pub fn server_connection(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServerConnection, message)
    }

    pub fn webview_load(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::WebViewLoad, message)
    }

    pub fn network_timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetworkTimeout, message)
    }

    pub fn port_in_use(port: u16) -> Self {
        Self::new(
            ErrorKind::PortInUse,
            format!("Port {port} is already in use"),
        )
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// User-facing one-line explanation, keyed by kind.
    pub fn friendly_message(&self) -> &'static str {
        match self.kind {
            ErrorKind::ServerStartup => "The local server could not be started.",
            ErrorKind::ServerConnection => "The local server stopped responding.",
            ErrorKind::WebViewLoad => "The page could not be displayed.",
            ErrorKind::NetworkTimeout => "The operation timed out.",
            ErrorKind::PortInUse => "Another application is using the server port.",
            ErrorKind::Unknown => "Something went wrong.",
        }
    }

    /// Ordered remediation steps, keyed by kind.
    pub fn suggested_actions(&self) -> &'static [&'static str] {
        match self.kind {
            ErrorKind::ServerStartup => &[
                "Restart the server",
                "Restart the application",
                "Check the application logs",
            ],
            ErrorKind::ServerConnection => &[
                "Restart the server",
                "Check that no firewall is blocking localhost",
            ],
            ErrorKind::WebViewLoad => &[
                "Reload the page",
                "Restart the server",
            ],
            ErrorKind::NetworkTimeout => &[
                "Try again",
                "Restart the server",
            ],
            ErrorKind::PortInUse => &[
                "Stop other apps that may be using the port",
                "Restart the device",
                "Use a different port",
            ],
            ErrorKind::Unknown => &[
                "Try again",
                "Restart the application",
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_is_totally_ordered() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_default_severities() {
        assert_eq!(
            ErrorKind::ServerStartup.default_severity(),
            Severity::High
        );
        assert_eq!(
            ErrorKind::ServerConnection.default_severity(),
            Severity::Medium
        );
        assert_eq!(ErrorKind::WebViewLoad.default_severity(), Severity::Medium);
        assert_eq!(
            ErrorKind::NetworkTimeout.default_severity(),
            Severity::Medium
        );
        assert_eq!(ErrorKind::PortInUse.default_severity(), Severity::High);
    }

    #[test]
    fn test_constructors_bind_default_severity() {
        let err = AppError::server_startup("bind failed");
        assert_eq!(err.kind, ErrorKind::ServerStartup);
        assert_eq!(err.severity, Severity::High);
        assert_eq!(err.message, "bind failed");

        let err = AppError::port_in_use(3000);
        assert_eq!(err.kind, ErrorKind::PortInUse);
        assert!(err.message.contains("3000"));
    }

    #[test]
    fn test_with_details_and_cause() {
        let err = AppError::server_connection("probe failed")
            .with_details("GET /api/status returned no response")
            .with_cause("connection refused");
        assert!(err.details.unwrap().contains("/api/status"));
        assert!(err.cause.unwrap().contains("refused"));
    }

    #[test]
    fn test_friendly_messages_nonempty_for_all_kinds() {
        let kinds = [
            ErrorKind::ServerStartup,
            ErrorKind::ServerConnection,
            ErrorKind::WebViewLoad,
            ErrorKind::NetworkTimeout,
            ErrorKind::PortInUse,
            ErrorKind::Unknown,
        ];
        for kind in kinds {
            let err = AppError::new(kind, "x");
            assert!(!err.friendly_message().is_empty());
            assert!(!err.suggested_actions().is_empty());
        }
    }

    #[test]
    fn test_port_in_use_suggested_actions_order() {
        let err = AppError::port_in_use(3000);
        let actions = err.suggested_actions();
        assert!(actions[0].contains("Stop other apps"));
        assert!(actions[1].contains("Restart the device"));
        assert!(actions[2].contains("different port"));
    }

    #[test]
    fn test_bind_error_classification() {
        let addr_in_use = std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use");
        let err = Error::from_bind_error(addr_in_use, 3000);
        assert!(matches!(err, Error::PortInUse { port: 3000 }));
        assert_eq!(err.to_app_error().kind, ErrorKind::PortInUse);

        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::from_bind_error(denied, 3000);
        assert!(matches!(err, Error::Bind { .. }));
        assert_eq!(err.to_app_error().kind, ErrorKind::ServerStartup);
    }

    #[test]
    fn test_error_display_messages() {
        let err = Error::PortInUse { port: 8080 };
        assert_eq!(err.to_string(), "Port 8080 is already in use");

        let err = Error::config("missing field");
        assert!(err.to_string().contains("missing field"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
