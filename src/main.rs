use anyhow::Context;
use app_host::config::HostConfig;
use app_host::server::HostServices;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = HostConfig::from_env().context("failed to load configuration")?;
    tracing::info!("Configuration: {:?}", config);

    // 1. Services:
    let services = HostServices::from_config(&config).await?;

    // 2. Workers:
    let workers = config.load_workers().context("failed to load workers")?;
    tracing::info!("Registered {} worker(s)", workers.len());
    services.supervisor.register_all(workers).await;

    if let Err(e) = services.supervisor.start_all().await {
        tracing::error!("Worker startup failed: {}", e);
        services.supervisor.stop_all().await;
        anyhow::bail!("failed to start workers: {}", e);
    }

    // 3. HTTP server:
    let addr = config.bind_addr();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            services.supervisor.stop_all().await;
            return Err(e).with_context(|| format!("failed to bind {}", addr));
        }
    };

    tracing::info!("App host listening on {}", addr);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(listener, services.router())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 4. Drain workers:
    tracing::info!("Stopping workers");
    for (name, outcome) in services.supervisor.stop_all().await {
        tracing::info!("Worker {}: {:?}", name, outcome);
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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

    tracing::info!("Shutdown signal received");
}
