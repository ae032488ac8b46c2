//! Shipline Worker - event-driven persistence worker.
//!
//! Consumes `user.registered`, `shipment.created` and `shipment.updated` from
//! the broker and persists them to the master `PostgreSQL` database.
//!
//! # Startup
//!
//! 1. Load configuration (`RABBITMQ_URL`, `MASTERDB_URL`, ...)
//! 2. Connect to `PostgreSQL` and apply migrations
//! 3. Connect to the broker, retrying with a fixed delay
//! 4. Declare every queue, then start one consumer loop per queue
//!
//! Any failure up to this point exits with status 1. Afterwards the worker
//! runs until SIGINT/SIGTERM, drains its loops and closes its connections.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use shipline_worker::config::WorkerConfig;
use shipline_worker::db::PgEventStore;
use shipline_worker::error::WorkerError;
use shipline_worker::state::WorkerContext;
use shipline_worker::telemetry;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            telemetry::init_fallback();
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    // Keep the guard alive for the whole process so Sentry can flush
    let _sentry_guard = telemetry::init(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Worker stopped");
        std::process::exit(1);
    }
}

async fn run(config: WorkerConfig) -> Result<(), WorkerError> {
    let grace = config.shutdown_grace;
    let mut context = WorkerContext::connect(config).await?;
    let store = Arc::new(PgEventStore::new(context.pool().clone()));

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    let supervisor = context.start_consumers(store, shutdown).await?;
    let summary = supervisor.run_until_shutdown(grace).await;

    for report in &summary.reports {
        tracing::info!(
            queue = %report.kind,
            received = report.stats.received,
            persisted = report.stats.persisted,
            discarded = report.stats.discarded(),
            "Consumer summary"
        );
    }

    context.close().await;

    match summary.unexpected_exit {
        Some(kind) => Err(WorkerError::ConsumerExited(kind.to_string())),
        None if summary.lost_tasks > 0 => Err(WorkerError::ConsumerExited(format!(
            "{} task(s)",
            summary.lost_tasks
        ))),
        None => Ok(()),
    }
}

/// Cancel `token` on Ctrl+C or SIGTERM.
async fn cancel_on_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
        () = ctrl_c => {},
        () = terminate => {},
        () = token.cancelled() => return,
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
    token.cancel();
}
