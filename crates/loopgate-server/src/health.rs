//! Health probing for the embedded server
//!
//! The probe is a seam: the lifecycle manager talks to [`HealthProbe`], the
//! production implementation issues a real HTTP GET against the server's
//! own status endpoint, and tests substitute a mock.

use std::time::Duration;

use async_trait::async_trait;

use loopgate_core::prelude::*;

/// How long a single probe may take before it counts as unhealthy.
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Verdict-producing health check. `true` means the server answered its
/// status endpoint with HTTP 200; anything else -- connection refused,
/// timeout, non-200 -- is unhealthy. No error ever crosses this boundary.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn check(&self, status_url: &str) -> bool;
}

/// Probe backed by a short-lived HTTP GET with connection reuse disabled,
/// so each check observes a fresh connect to the listener.
pub struct HttpHealthProbe {
    client: reqwest::Client,
}

impl HttpHealthProbe {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| Error::probe(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn check(&self, status_url: &str) -> bool {
        match self.client.get(status_url).send().await {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(e) => {
                debug!("Health probe failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_probe_unreachable_port_is_unhealthy() {
        // Bind then drop to get a port that is almost certainly closed
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let probe = HttpHealthProbe::new().unwrap();
        let url = format!("http://127.0.0.1:{port}/api/status");
        assert!(!probe.check(&url).await);
    }

    #[tokio::test]
    async fn test_probe_invalid_url_is_unhealthy() {
        let probe = HttpHealthProbe::new().unwrap();
        assert!(!probe.check("http://").await);
    }

    #[tokio::test]
    async fn test_mock_probe() {
        let mut probe = MockHealthProbe::new();
        probe.expect_check().returning(|_| true);
        assert!(probe.check("http://127.0.0.1:3000/api/status").await);
    }
}
