use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use fincache_server::api::app_router;
use fincache_server::config::Config;
use fincache_server::{build_state, init_tracing};

const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    init_tracing();

    // Root cancellation token: cancelled on SIGINT/SIGTERM so in-flight
    // scraper fetches and worker loops stop promptly during shutdown.
    let cancel = CancellationToken::new();
    let (state, worker_pool) = build_state(&config, cancel.clone())?;

    // Re-queue jobs interrupted by a previous crash, then start claiming.
    state.job_service.recover_stale_jobs().await?;
    let pool_handle = tokio::spawn(worker_pool.run(cancel.clone()));
    state.notify.notify_one();

    let router = app_router(state);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr, "server started");

    let serve_cancel = cancel.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { serve_cancel.cancelled().await })
            .await
    });

    tokio::select! {
        result = &mut server => {
            // The listener died on its own; nothing to drain.
            cancel.cancel();
            let _ = pool_handle.await;
            result??;
            return Ok(());
        }
        _ = shutdown_signal() => {
            info!("shutdown signal received");
        }
    }

    // Cancel first so in-flight requests and their scraper fetches start
    // unwinding, then drain the workers before the store goes away, and only
    // then give open connections a bounded window to finish.
    cancel.cancel();
    let _ = pool_handle.await;

    match tokio::time::timeout(SHUTDOWN_DEADLINE, &mut server).await {
        Ok(result) => result??,
        Err(_) => {
            error!("timed out waiting for connections to drain");
            server.abort();
        }
    }

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
