//! subguard — subscription source health daemon.
//!
//! Periodically probes every configured subscription source, tracks
//! consecutive failures across restarts, and evicts sources that stay dead.
//! Timing is a fixed interval or a cron expression; the configuration file is
//! hot-reloaded, and SIGUSR1 triggers an immediate round.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use subguard_core::{AppConfig, ConfigWatcher};
use subguard_lifecycle::LifecycleManager;
use subguard_probe::HttpFetchRound;
use subguard_scheduler::{Scheduler, SchedulerHandle};

// ── CLI ─────────────────────────────────────────────────────────────

/// Subscription source health daemon.
#[derive(Parser, Debug)]
#[command(name = "subguard", version, about)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(
        short = 'f',
        long,
        env = "SUBGUARD_CONFIG",
        default_value = "config/config.yaml"
    )]
    config: PathBuf,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config)?;
    info!(
        path = %cli.config.display(),
        sources = config.sub_urls.len(),
        "loaded configuration"
    );

    let lifecycle = Arc::new(LifecycleManager::new(
        &cli.config,
        config.sub_urls_fail_remove,
    ));
    let round = Arc::new(HttpFetchRound::new(&cli.config));

    let mut scheduler = Scheduler::new(&config, round, lifecycle);
    let handle = scheduler.handle();
    scheduler.start();

    let (watcher, reload_rx) = ConfigWatcher::new(&cli.config);
    // The fs watcher stops when dropped; hold it for the process lifetime.
    let _fs_watcher = watcher.run()?;

    spawn_manual_trigger_listener(handle);

    tokio::select! {
        _ = scheduler.run(reload_rx) => {}
        _ = tokio::signal::ctrl_c() => info!("shutdown signal received, exiting"),
    }
    Ok(())
}

/// Fire an immediate validation round on SIGUSR1.
#[cfg(unix)]
fn spawn_manual_trigger_listener(handle: SchedulerHandle) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut sigusr1 = match signal(SignalKind::user_defined1()) {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "could not install SIGUSR1 handler");
                return;
            }
        };
        while sigusr1.recv().await.is_some() {
            handle.trigger_manual();
        }
    });
}

#[cfg(not(unix))]
fn spawn_manual_trigger_listener(_handle: SchedulerHandle) {}
