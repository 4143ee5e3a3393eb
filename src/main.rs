//! loopgate - a local HTTP control-plane and navigation gate for embedded
//! webviews
//!
//! This is the binary entry point. All logic lives in the workspace crates;
//! the binary is the composition root plus the headless runner.

mod headless;

use std::path::PathBuf;

use clap::Parser;

/// loopgate - local HTTP control-plane for embedded webviews
#[derive(Parser, Debug)]
#[command(name = "loopgate")]
#[command(
    about = "A local HTTP control-plane and navigation gate for embedded webviews",
    long_about = None
)]
struct Args {
    /// Base directory holding .loopgate/config.toml
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,

    /// Override the configured server port
    #[arg(long)]
    port: Option<u16>,

    /// Do not start the server on launch
    #[arg(long)]
    no_autostart: bool,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    loopgate_core::logging::init()?;

    let args = Args::parse();

    let base_dir = args
        .path
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let mut settings = loopgate_core::load_settings(&base_dir);
    if let Some(port) = args.port {
        settings.server.port = port;
    }

    tracing::info!(
        "Configured for {}:{}",
        settings.server.host,
        settings.server.port
    );

    headless::runner::run(settings, args.no_autostart).await?;
    Ok(())
}
