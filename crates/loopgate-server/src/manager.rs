//! Server lifecycle management
//!
//! [`ServerManager`] owns everything the embedded server is made of: the
//! lifecycle state, the bound listener (as the task serving it), and the
//! health-check loop. Nobody else mutates any of them. The UI layer drives
//! the manager through `start`/`stop`/`restart` and observes it through the
//! status and log streams; failures travel on the error bus, never as
//! uncaught faults.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

use loopgate_core::prelude::*;
use loopgate_core::{
    AppError, ErrorBus, ServerEvents, ServerState, SessionSnapshot, Settings,
};

use crate::health::{HealthProbe, HttpHealthProbe};
use crate::routes::{build_router, RouteContext};

/// Handles owned by a running (or partially running) server.
///
/// The serve task owns the bound `TcpListener`; aborting the task drops the
/// listener, which is the force-close: in-flight requests are cut off and
/// any late response writes are simply discarded by the runtime.
#[derive(Default)]
struct ServerRuntime {
    serve_task: Option<JoinHandle<()>>,
    health_task: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl Drop for ServerRuntime {
    fn drop(&mut self) {
        // Safety net if the manager is dropped without a stop() call.
        if let Some(task) = self.health_task.take() {
            task.abort();
        }
        if let Some(task) = self.serve_task.take() {
            task.abort();
        }
    }
}

/// Owns the embedded HTTP server's state machine, listener, and health
/// supervision.
///
/// Constructed once at the composition root and shared by `Arc`; all
/// methods take `&self`.
pub struct ServerManager {
    settings: Settings,
    state: Arc<RwLock<ServerState>>,
    events: Arc<ServerEvents>,
    bus: Arc<ErrorBus>,
    probe: Arc<dyn HealthProbe>,
    runtime: Arc<Mutex<ServerRuntime>>,
}

impl ServerManager {
    /// Manager with the production HTTP health probe.
    pub fn new(settings: Settings, bus: Arc<ErrorBus>) -> Result<Self> {
        let probe = Arc::new(HttpHealthProbe::new()?);
        Ok(Self::with_probe(settings, bus, probe))
    }

    /// Manager with a caller-supplied probe (tests, instrumentation).
    pub fn with_probe(
        settings: Settings,
        bus: Arc<ErrorBus>,
        probe: Arc<dyn HealthProbe>,
    ) -> Self {
        Self {
            settings,
            state: Arc::new(RwLock::new(ServerState::Stopped)),
            events: Arc::new(ServerEvents::new()),
            bus,
            probe,
            runtime: Arc::new(Mutex::new(ServerRuntime::default())),
        }
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> ServerState {
        *self.state.read().await
    }

    /// Subscribe to state transitions, in transition order.
    pub fn subscribe_status(&self) -> broadcast::Receiver<ServerState> {
        self.events.subscribe_status()
    }

    /// Subscribe to diagnostic log lines (request log, lifecycle notes).
    pub fn subscribe_logs(&self) -> broadcast::Receiver<String> {
        self.events.subscribe_logs()
    }

    /// Base URL of the live listener, if any.
    pub async fn server_url(&self) -> Option<String> {
        self.runtime
            .lock()
            .await
            .local_addr
            .map(|addr| format!("http://{addr}"))
    }

    /// Start the server.
    ///
    /// No-op success when already `Running` or `Starting`: a concurrent
    /// caller gets `true` immediately and follows the in-flight attempt on
    /// the status stream. Returns `false` after reporting on the error bus
    /// when the bind fails.
    pub async fn start(&self) -> bool {
        if self.start_is_noop().await {
            return true;
        }
        let mut runtime = self.runtime.lock().await;
        if self.start_is_noop().await {
            return true;
        }

        self.transition(ServerState::Starting).await;
        let bind_addr = format!(
            "{}:{}",
            self.settings.server.host, self.settings.server.port
        );
        self.events.emit_log(format!("Starting server on {bind_addr}"));

        let listener = match TcpListener::bind(&bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                let err = Error::from_bind_error(e, self.settings.server.port);
                warn!("Bind failed: {}", err);
                self.bus.report(err.to_app_error());
                self.transition(ServerState::Error).await;
                return false;
            }
        };
        let local_addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                self.bus
                    .report(AppError::server_startup(e.to_string()).with_cause("local_addr"));
                self.transition(ServerState::Error).await;
                return false;
            }
        };

        let ctx = Arc::new(RouteContext {
            port: local_addr.port(),
            cert_path: self.settings.server.cert_path.clone(),
            events: self.events.clone(),
        });
        let router = build_router(ctx);

        let events = self.events.clone();
        let serve_task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                warn!("Serve loop ended unexpectedly: {}", e);
                events.emit_log(format!("Serve loop ended: {e}"));
            }
        });

        runtime.serve_task = Some(serve_task);
        runtime.local_addr = Some(local_addr);
        self.transition(ServerState::Running).await;
        self.events
            .emit_log(format!("Server listening on http://{local_addr}"));
        info!("Server listening on http://{}", local_addr);

        runtime.health_task = Some(self.spawn_health_loop(local_addr));
        true
    }

    /// Stop the server.
    ///
    /// No-op success when already `Stopped` or `Stopping`. The health loop
    /// is cancelled before the listener is force-closed so no stale probe
    /// can observe the close and double-report.
    pub async fn stop(&self) -> bool {
        if self.stop_is_noop().await {
            return true;
        }
        let mut runtime = self.runtime.lock().await;
        if self.stop_is_noop().await {
            return true;
        }

        self.transition(ServerState::Stopping).await;

        if let Some(task) = runtime.health_task.take() {
            task.abort();
            let _ = task.await;
        }

        if let Some(task) = runtime.serve_task.take() {
            // Force-close: do not wait for in-flight requests to drain.
            task.abort();
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    self.bus.report(
                        AppError::server_startup("Failed to close listener")
                            .with_cause(e.to_string()),
                    );
                    runtime.local_addr = None;
                    self.transition(ServerState::Error).await;
                    return false;
                }
            }
        }

        runtime.local_addr = None;
        self.transition(ServerState::Stopped).await;
        self.events.emit_log("Server stopped");
        info!("Server stopped");
        true
    }

    /// Stop, wait for the OS to release the socket, start again.
    /// Returns the start attempt's result.
    pub async fn restart(&self) -> bool {
        self.stop().await;
        let delay = Duration::from_millis(self.settings.health.restart_delay_ms);
        self.events
            .emit_log(format!("Restarting in {} ms", delay.as_millis()));
        tokio::time::sleep(delay).await;
        self.start().await
    }

    /// One on-demand health probe against the live listener.
    ///
    /// `false` immediately unless `Running` with a bound address; transport
    /// errors inside the probe are swallowed as unhealthy.
    pub async fn is_healthy(&self) -> bool {
        if self.state().await != ServerState::Running {
            return false;
        }
        let status_url = {
            let runtime = self.runtime.lock().await;
            match runtime.local_addr {
                Some(addr) => format!("http://{addr}/api/status"),
                None => return false,
            }
        };
        self.probe.check(&status_url).await
    }

    /// Start the server again if the previous session was recent and had it
    /// running. Returns whether a start was attempted and succeeded.
    pub async fn resume_from(&self, snapshot: &SessionSnapshot) -> bool {
        if snapshot.is_stale() {
            self.events
                .emit_log("Previous session is stale; not resuming");
            return false;
        }
        if !snapshot.was_server_running {
            return false;
        }
        self.events.emit_log("Resuming server from previous session");
        self.start().await
    }

    async fn start_is_noop(&self) -> bool {
        matches!(
            self.state().await,
            ServerState::Running | ServerState::Starting
        )
    }

    async fn stop_is_noop(&self) -> bool {
        matches!(
            self.state().await,
            ServerState::Stopped | ServerState::Stopping
        )
    }

    async fn transition(&self, to: ServerState) {
        *self.state.write().await = to;
        self.events.emit_status(to);
        debug!("Server state -> {}", to);
    }

    /// Periodic supervision while `Running`.
    ///
    /// A failed probe is terminal for the current run: report once, tear
    /// the listener down, enter `Error`, stop ticking. An explicit
    /// `start`/`restart` is required to recover.
    fn spawn_health_loop(&self, addr: SocketAddr) -> JoinHandle<()> {
        let probe = Arc::clone(&self.probe);
        let bus = Arc::clone(&self.bus);
        let events = Arc::clone(&self.events);
        let state = Arc::clone(&self.state);
        let runtime = Arc::clone(&self.runtime);
        let period = Duration::from_secs(self.settings.health.interval_secs);
        let status_url = format!("http://{addr}/api/status");

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;

                if *state.read().await != ServerState::Running {
                    break;
                }
                if probe.check(&status_url).await {
                    continue;
                }
                // A stop may have raced the probe; only a failure observed
                // while still Running counts.
                if *state.read().await != ServerState::Running {
                    break;
                }

                bus.report(AppError::server_connection(
                    "Health check failed: status endpoint did not answer",
                ));

                let mut rt = runtime.lock().await;
                if let Some(task) = rt.serve_task.take() {
                    task.abort();
                }
                rt.local_addr = None;
                rt.health_task = None;
                *state.write().await = ServerState::Error;
                events.emit_status(ServerState::Error);
                events.emit_log("Health check failed; server marked unhealthy");
                break;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::MockHealthProbe;
    use loopgate_core::{ErrorKind, HealthSettings, ServerSettings};
    use std::path::PathBuf;

    fn test_settings() -> Settings {
        Settings {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                // Ephemeral port so tests never collide
                port: 0,
                cert_path: PathBuf::from("certs/localhost.crt"),
            },
            health: HealthSettings {
                interval_secs: 1,
                restart_delay_ms: 10,
            },
        }
    }

    fn healthy_probe() -> Arc<dyn HealthProbe> {
        let mut probe = MockHealthProbe::new();
        probe.expect_check().returning(|_| true);
        Arc::new(probe)
    }

    fn failing_probe() -> Arc<dyn HealthProbe> {
        let mut probe = MockHealthProbe::new();
        probe.expect_check().returning(|_| false);
        Arc::new(probe)
    }

    fn test_manager(probe: Arc<dyn HealthProbe>) -> ServerManager {
        ServerManager::with_probe(test_settings(), Arc::new(ErrorBus::new()), probe)
    }

    async fn recv_status(
        rx: &mut broadcast::Receiver<ServerState>,
    ) -> ServerState {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for status event")
            .expect("status stream closed")
    }

    #[tokio::test]
    async fn test_start_emits_starting_then_running() {
        let manager = test_manager(healthy_probe());
        let mut rx = manager.subscribe_status();

        assert!(manager.start().await);

        assert_eq!(recv_status(&mut rx).await, ServerState::Starting);
        assert_eq!(recv_status(&mut rx).await, ServerState::Running);
        assert_eq!(manager.state().await, ServerState::Running);
        assert!(manager.server_url().await.is_some());

        manager.stop().await;
    }

    #[tokio::test]
    async fn test_stop_emits_stopping_then_stopped() {
        let manager = test_manager(healthy_probe());
        assert!(manager.start().await);

        let mut rx = manager.subscribe_status();
        assert!(manager.stop().await);

        assert_eq!(recv_status(&mut rx).await, ServerState::Stopping);
        assert_eq!(recv_status(&mut rx).await, ServerState::Stopped);
        assert_eq!(manager.state().await, ServerState::Stopped);
        assert!(manager.server_url().await.is_none());
    }

    #[tokio::test]
    async fn test_start_twice_is_noop_with_single_listener() {
        let manager = test_manager(healthy_probe());
        let mut rx = manager.subscribe_status();

        assert!(manager.start().await);
        let url_first = manager.server_url().await;
        assert!(manager.start().await);

        // Exactly one Starting/Running pair, same listener
        assert_eq!(recv_status(&mut rx).await, ServerState::Starting);
        assert_eq!(recv_status(&mut rx).await, ServerState::Running);
        assert!(rx.try_recv().is_err());
        assert_eq!(manager.server_url().await, url_first);

        manager.stop().await;
    }

    #[tokio::test]
    async fn test_stop_when_stopped_is_silent_noop() {
        let manager = test_manager(healthy_probe());
        let mut rx = manager.subscribe_status();

        assert!(manager.stop().await);
        assert!(rx.try_recv().is_err());
        assert_eq!(manager.state().await, ServerState::Stopped);
    }

    #[tokio::test]
    async fn test_bind_conflict_reports_port_in_use() {
        // Occupy a port, then point the manager at it
        let blocker = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = blocker.local_addr().unwrap().port();

        let mut settings = test_settings();
        settings.server.port = port;
        let bus = Arc::new(ErrorBus::new());
        let mut errors = bus.subscribe();
        let manager = ServerManager::with_probe(settings, bus, healthy_probe());

        assert!(!manager.start().await);
        assert_eq!(manager.state().await, ServerState::Error);

        let err = errors.try_recv().unwrap();
        assert_eq!(err.kind, ErrorKind::PortInUse);
        assert!(errors.try_recv().is_err(), "exactly one error expected");
    }

    #[tokio::test]
    async fn test_error_state_accepts_fresh_start() {
        let blocker = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = blocker.local_addr().unwrap().port();

        let mut settings = test_settings();
        settings.server.port = port;
        let manager = ServerManager::with_probe(
            settings,
            Arc::new(ErrorBus::new()),
            healthy_probe(),
        );

        assert!(!manager.start().await);
        assert_eq!(manager.state().await, ServerState::Error);

        drop(blocker);
        assert!(manager.start().await);
        assert_eq!(manager.state().await, ServerState::Running);

        manager.stop().await;
    }

    #[tokio::test]
    async fn test_restart_cycles_through_all_states() {
        let manager = test_manager(healthy_probe());
        assert!(manager.start().await);

        let mut rx = manager.subscribe_status();
        assert!(manager.restart().await);

        assert_eq!(recv_status(&mut rx).await, ServerState::Stopping);
        assert_eq!(recv_status(&mut rx).await, ServerState::Stopped);
        assert_eq!(recv_status(&mut rx).await, ServerState::Starting);
        assert_eq!(recv_status(&mut rx).await, ServerState::Running);

        manager.stop().await;
    }

    #[tokio::test]
    async fn test_is_healthy_false_when_not_running() {
        let manager = test_manager(healthy_probe());
        assert!(!manager.is_healthy().await);
    }

    #[tokio::test]
    async fn test_is_healthy_delegates_to_probe_when_running() {
        let manager = test_manager(healthy_probe());
        assert!(manager.start().await);
        assert!(manager.is_healthy().await);
        manager.stop().await;

        let manager = test_manager(failing_probe());
        assert!(manager.start().await);
        assert!(!manager.is_healthy().await);
        manager.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_failure_is_one_shot_and_terminal() {
        let bus = Arc::new(ErrorBus::new());
        let mut errors = bus.subscribe();
        let manager =
            ServerManager::with_probe(test_settings(), bus, failing_probe());

        assert!(manager.start().await);

        let err = tokio::time::timeout(Duration::from_secs(30), errors.recv())
            .await
            .expect("health failure was never reported")
            .unwrap();
        assert_eq!(err.kind, ErrorKind::ServerConnection);

        // Give the loop several more intervals: it must not fire again
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(errors.try_recv().is_err(), "health error must be one-shot");

        assert_eq!(manager.state().await, ServerState::Error);
        assert!(manager.server_url().await.is_none());
    }

    #[tokio::test]
    async fn test_resume_from_fresh_running_snapshot() {
        let manager = test_manager(healthy_probe());
        let snapshot = SessionSnapshot::now(true, true, None);

        assert!(manager.resume_from(&snapshot).await);
        assert_eq!(manager.state().await, ServerState::Running);
        manager.stop().await;
    }

    #[tokio::test]
    async fn test_resume_skips_stale_snapshot() {
        let manager = test_manager(healthy_probe());
        let mut snapshot = SessionSnapshot::now(true, true, None);
        snapshot.timestamp = chrono::Local::now() - chrono::Duration::hours(48);

        assert!(!manager.resume_from(&snapshot).await);
        assert_eq!(manager.state().await, ServerState::Stopped);
    }

    #[tokio::test]
    async fn test_resume_skips_snapshot_without_running_server() {
        let manager = test_manager(healthy_probe());
        let snapshot = SessionSnapshot::now(false, true, None);

        assert!(!manager.resume_from(&snapshot).await);
        assert_eq!(manager.state().await, ServerState::Stopped);
    }
}
