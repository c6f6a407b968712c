use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use quantum_tasks::config::{AppConfig, LogFormat};
use quantum_tasks::executor::{CircuitExecutor, StatevectorExecutor};
use quantum_tasks::store::{Database, LibSqlBackend};
use quantum_tasks::tasks::{TaskService, app};
use quantum_tasks::worker::{Activity, Orchestrator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("Failed to load configuration")?;
    let _log_guard = init_tracing(config.log_format);

    info!(version = env!("CARGO_PKG_VERSION"), "Quantum Tasks starting");

    // ── Store ────────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .context("Failed to open database")?,
    );

    // ── Execution ────────────────────────────────────────────────────────
    let executor: Arc<dyn CircuitExecutor> = Arc::new(StatevectorExecutor::new(config.max_qubits));
    let activity = Arc::new(
        Activity::new(Arc::clone(&db), executor, config.shots)
            .with_failure_writes(config.failure_writes),
    );
    let orchestrator = Orchestrator::new(Arc::clone(&db), activity, config.retry.clone());

    let resumed = orchestrator
        .recover()
        .await
        .context("Failed to recover interrupted runs")?;
    info!(
        resumed,
        max_attempts = config.retry.max_attempts,
        failure_writes = %config.failure_writes,
        shots = config.shots,
        "Orchestrator ready"
    );

    // ── HTTP ─────────────────────────────────────────────────────────────
    let service = TaskService::new(
        Arc::clone(&db),
        orchestrator.clone(),
        config.max_payload_bytes,
        config.start_timeout,
    );
    let router = app(service, &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    orchestrator.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}

/// Install the global subscriber. Logs go to stdout through a non-blocking
/// writer; the returned guard flushes it on drop.
fn init_tracing(format: LogFormat) -> WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_target(false);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
    guard
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
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
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
