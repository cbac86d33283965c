use std::sync::Arc;

use crawlctl_core::config::ManagerConfig;
use crawlctl_jobq::JobQueueClient;
use crawlctl_manager::ManagerError;
use crawlctl_worker::runner::{self, LoopConfig};
use crawlctl_worker::setup::{build_policy, SimulationConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crawlctl_worker=info,crawlctl_manager=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run_manager().await {
        tracing::error!(error = %e, "Crawl manager failed");
        std::process::exit(1);
    }
}

async fn run_manager() -> Result<(), ManagerError> {
    // --- Configuration ---
    let config = ManagerConfig::from_env()?;
    tracing::info!(
        mode = config.mode.as_str(),
        spider = %config.template.job_type,
        flow_id = ?config.template.flow_id,
        max_running_jobs = ?config.max_running_jobs,
        "Loaded crawl manager configuration",
    );

    // --- Job queue (local dry run) ---
    let simulation = SimulationConfig::from_env()?;
    tracing::info!(
        project_id = %simulation.project_id,
        polls_until_finished = simulation.behavior.polls_until_finished,
        outcome = %simulation.behavior.outcome,
        "Using simulated job queue",
    );
    let client: Arc<dyn JobQueueClient> =
        Arc::new(simulation.into_queue(config.own_job_key.clone()));

    // --- Policy ---
    let mut policy = build_policy(&config, client)?;

    // --- Shutdown ---
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_cancel.cancel();
    });

    let report = runner::run(&mut *policy, &LoopConfig::from_config(&config), cancel).await?;
    tracing::info!(
        ticks = report.ticks,
        end = ?report.end,
        outcome = ?report.terminal_outcome,
        "Crawl manager done",
    );
    Ok(())
}

/// Resolve on SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), closing crawl manager");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, closing crawl manager");
        }
    }
}
