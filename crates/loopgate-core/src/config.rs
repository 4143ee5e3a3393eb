//! Configuration: the compiled-in navigation allow-list and the optional
//! `.loopgate/config.toml` settings file

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::error::{Error, Result};

const CONFIG_FILENAME: &str = "config.toml";
const LOOPGATE_DIR: &str = ".loopgate";

/// Default loopback bind port.
pub const DEFAULT_PORT: u16 = 3000;
/// Default loopback bind host.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Seconds between health probes while the server is running.
pub const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 10;
/// Delay between stop and start during a restart, letting the OS release
/// the socket.
pub const DEFAULT_RESTART_DELAY_MS: u64 = 500;

// ─────────────────────────────────────────────────────────────────────────────
// Navigation allow-list
// ─────────────────────────────────────────────────────────────────────────────

/// The closed set of schemes, hosts, and ports the embedded view may
/// navigate to. Compiled in and immutable for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowListConfig {
    pub schemes: &'static [&'static str],
    pub hosts: &'static [&'static str],
    pub ports: &'static [u16],
}

const ALLOWED_SCHEMES: &[&str] = &["http", "https"];
const ALLOWED_HOSTS: &[&str] = &["localhost", "127.0.0.1", "0.0.0.0"];
const ALLOWED_PORTS: &[u16] = &[3000, 8000, 8080, 3001, 5000];

impl AllowListConfig {
    pub fn allows_scheme(&self, scheme: &str) -> bool {
        self.schemes.iter().any(|s| s.eq_ignore_ascii_case(scheme))
    }

    pub fn allows_host(&self, host: &str) -> bool {
        self.hosts.iter().any(|h| h.eq_ignore_ascii_case(host))
    }

    pub fn allows_port(&self, port: u16) -> bool {
        self.ports.contains(&port)
    }
}

impl Default for AllowListConfig {
    fn default() -> Self {
        Self {
            schemes: ALLOWED_SCHEMES,
            hosts: ALLOWED_HOSTS,
            ports: ALLOWED_PORTS,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Settings file
// ─────────────────────────────────────────────────────────────────────────────

/// Settings loaded from `.loopgate/config.toml`, all optional with defaults.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub health: HealthSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Loopback address the listener binds to.
    pub host: String,
    /// Fixed port. Port 0 asks the OS for an ephemeral port (used by tests).
    pub port: u16,
    /// Certificate file served by `GET /cert`.
    pub cert_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HealthSettings {
    pub interval_secs: u64,
    pub restart_delay_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cert_path: PathBuf::from("certs/localhost.crt"),
        }
    }
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_HEALTH_INTERVAL_SECS,
            restart_delay_ms: DEFAULT_RESTART_DELAY_MS,
        }
    }
}

/// Parse a settings document. Unknown keys are ignored; missing keys take
/// their defaults.
pub fn parse_settings(contents: &str) -> Result<Settings> {
    toml::from_str(contents).map_err(|e| Error::config(e.to_string()))
}

/// Load settings for a base directory, falling back to defaults.
///
/// Never fails: a missing file is the normal case, an unreadable or invalid
/// file is logged and ignored.
pub fn load_settings(base_dir: &Path) -> Settings {
    let path = base_dir.join(LOOPGATE_DIR).join(CONFIG_FILENAME);
    if !path.exists() {
        return Settings::default();
    }

    let contents = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            return Settings::default();
        }
    };

    match parse_settings(&contents) {
        Ok(settings) => settings,
        Err(e) => {
            warn!("Invalid settings in {}: {}", path.display(), e);
            Settings::default()
        }
    }
}
