//! # Gauge Monitor
//!
//! Stream MAX17205 fuel-gauge registers over SSH, persist them and chart them
//! live.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Set up logging with tracing subscriber
//!    - Load `gauge-monitor.toml` (or defaults)
//!    - Open the SSH connection to the gauge host
//!
//! 2. **Monitoring**
//!    - Read 7 registers every 100 ms and append them to the history
//!    - Redraw the chart PNG at 8 Hz once the first sample exists
//!
//! 3. **Shutdown** (Ctrl+C or any read/render failure)
//!    - Stop both tasks
//!    - Save the history to `db.json`
//!    - Exit non-zero if a task or the save failed
//!
//! Expected output:
//! ```text
//! INFO gauge_monitor: Gauge Monitor v0.1.0 starting...
//! INFO gauge_monitor::remote: Connected to zs2149027
//! INFO gauge_monitor::store: Loaded 12000 samples from db.json
//! INFO gauge_monitor::sampler: Sampling fuel gauge every 100ms
//! INFO gauge_monitor::render: Rendering chart to gauge-monitor.png every 125ms
//! ```

use anyhow::{Context, Result};
use tracing::info;

use gauge_monitor::config::Config;
use gauge_monitor::monitor;
use gauge_monitor::remote::SshShell;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Gauge Monitor v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::load_or_default().context("failed to load configuration")?;
    let shell = SshShell::connect(&config.remote).await?;

    info!("Press Ctrl+C to exit");
    monitor::run(&config, shell, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await?;

    info!("Gauge Monitor stopped");
    Ok(())
}
