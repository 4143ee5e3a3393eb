//! Headless mode runner - main event loop without a UI
//!
//! Wires the lifecycle manager, error bus, and navigation policy together,
//! forwards their streams to stdout as NDJSON, and accepts line commands on
//! stdin (`start`, `stop`, `restart`, `health`, `check <url>`, `quit`).

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use loopgate_core::prelude::*;
use loopgate_core::{ErrorBus, Settings};
use loopgate_policy::NavigationPolicy;
use loopgate_server::ServerManager;

use super::HeadlessEvent;

/// Commands accepted on stdin.
#[derive(Debug)]
enum Command {
    Start,
    Stop,
    Restart,
    Health,
    /// Print navigation verdicts for a target URL
    Check { url: String },
    Quit,
}

/// Run in headless mode - output JSON events, read commands from stdin.
pub async fn run(settings: Settings, no_autostart: bool) -> Result<()> {
    info!("loopgate starting in headless mode");

    let bus = Arc::new(ErrorBus::new());
    let manager = Arc::new(ServerManager::new(settings, Arc::clone(&bus))?);
    let policy = NavigationPolicy::default();

    spawn_stream_forwarders(&manager, &bus);

    // Stdin reader lives on a blocking thread; commands flow through a channel
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(16);
    std::thread::spawn(move || read_stdin_commands(cmd_tx));

    if !no_autostart && manager.start().await {
        if let Some(url) = manager.server_url().await {
            HeadlessEvent::server_url(&url).emit();
        }
    }

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else { break };
                if handle_command(cmd, &manager, &policy).await {
                    break;
                }
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!("Failed to listen for ctrl-c: {}", e);
                }
                info!("Interrupt received, shutting down");
                break;
            }
        }
    }

    manager.stop().await;
    bus.close();
    info!("loopgate headless mode exiting");
    Ok(())
}

/// Returns `true` when the loop should exit.
async fn handle_command(
    cmd: Command,
    manager: &Arc<ServerManager>,
    policy: &NavigationPolicy,
) -> bool {
    match cmd {
        Command::Start => {
            if manager.start().await {
                if let Some(url) = manager.server_url().await {
                    HeadlessEvent::server_url(&url).emit();
                }
            }
        }
        Command::Stop => {
            manager.stop().await;
        }
        Command::Restart => {
            if manager.restart().await {
                if let Some(url) = manager.server_url().await {
                    HeadlessEvent::server_url(&url).emit();
                }
            }
        }
        Command::Health => {
            HeadlessEvent::health(manager.is_healthy().await).emit();
        }
        Command::Check { url } => {
            let server_url = manager.server_url().await.unwrap_or_default();
            let user = policy.decide(&url, &server_url, true);
            let auto = policy.decide(&url, &server_url, false);
            let block_reason = policy.block_reason(&url);
            HeadlessEvent::Navigation {
                url,
                user_initiated_verdict: verdict_label(user.is_allowed()),
                automatic_verdict: verdict_label(auto.is_allowed()),
                block_reason,
                timestamp: chrono::Utc::now().timestamp_millis(),
            }
            .emit();
        }
        Command::Quit => return true,
    }
    false
}

fn verdict_label(allowed: bool) -> String {
    if allowed { "navigate" } else { "prevent" }.to_string()
}

/// Forward the manager's status/log streams and the error bus to stdout.
fn spawn_stream_forwarders(manager: &Arc<ServerManager>, bus: &Arc<ErrorBus>) {
    let mut status_rx = manager.subscribe_status();
    tokio::spawn(async move {
        loop {
            match status_rx.recv().await {
                Ok(state) => HeadlessEvent::status(state).emit(),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Status stream lagged, {} events dropped", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut log_rx = manager.subscribe_logs();
    tokio::spawn(async move {
        loop {
            match log_rx.recv().await {
                Ok(line) => HeadlessEvent::log(line).emit(),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Log stream lagged, {} lines dropped", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut error_rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match error_rx.recv().await {
                Ok(err) => HeadlessEvent::from_error(&err).emit(),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Error stream lagged, {} errors dropped", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// Blocking stdin reader. Runs on its own thread; exits when stdin closes.
fn read_stdin_commands(cmd_tx: mpsc::Sender<Command>) {
    use std::io::BufRead;

    let stdin = std::io::stdin();
    let reader = stdin.lock();

    for line in reader.lines() {
        let Ok(line) = line else { break };
        let trimmed = line.trim();

        let cmd = match trimmed {
            "" => continue,
            "start" => Command::Start,
            "stop" => Command::Stop,
            "restart" => Command::Restart,
            "health" => Command::Health,
            "q" | "quit" | "exit" => Command::Quit,
            other => {
                if let Some(url) = other.strip_prefix("check ") {
                    Command::Check {
                        url: url.trim().to_string(),
                    }
                } else {
                    warn!("Unknown command: {}", other);
                    continue;
                }
            }
        };

        if cmd_tx.blocking_send(cmd).is_err() {
            break;
        }
    }
}
