use mimalloc::MiMalloc;
use pwadir::bootstrap::{Backends, Services};
use pwadir::server::router::{DirectoryState, directory_router};
use pwadir::tasks::TaskWorkerHandle;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = &pwadir::config::CONFIG;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.basic.database_url,
        loglevel = %cfg.basic.loglevel,
        listen_addr = %cfg.basic.listen_addr,
        listen_port = cfg.basic.listen_port,
        public_url = %cfg.basic.public_url,
        admin_key_len = cfg.basic.admin_key.len(),
        "Basic config loaded"
    );

    let db = pwadir::db::spawn(&cfg.basic.database_url).await;
    let backends = Backends::from_config(cfg)?;
    let services = Services::new(db, backends, cfg);

    let worker = if cfg.tasks.enabled {
        let handle =
            TaskWorkerHandle::spawn(services.tasks.clone(), services.pwa.clone(), cfg.tasks.clone())
                .await
                .map_err(|e| e.to_string())?;
        info!(
            poll_interval_secs = cfg.tasks.poll_interval_secs,
            batch_size = cfg.tasks.batch_size,
            per_minute = cfg.tasks.per_minute,
            "Task worker started"
        );
        Some(handle)
    } else {
        warn!("Task worker disabled; queued re-validations will not run");
        None
    };

    let state = DirectoryState::new(
        services,
        Arc::from(cfg.basic.admin_key.as_str()),
        cfg.basic.public_base(),
    );
    let app = directory_router(state);

    let addr = SocketAddr::from((cfg.basic.listen_addr, cfg.basic.listen_port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(worker) = worker {
        worker.stop();
    }
    info!("Server has shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Ctrl+C received, shutting down"),
        () = terminate => info!("SIGTERM received, shutting down"),
    }
}
