use std::sync::Arc;
use std::time::Duration;

use log::{error, info};
use ssacli_exporter_core::{MetricStore, ProbeConfig, ProbeLoop};

/// How long shutdown waits for an in-flight probe cycle.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Everything `serve` needs, resolved from the command line.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub host: String,
    pub port: u16,
    pub probe: ProbeConfig,
}

pub fn run(config: ServeConfig) {
    let store = match MetricStore::new() {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("failed to register metrics: {e}");
            std::process::exit(1);
        }
    };

    let probe = ProbeLoop::from_config(&config.probe, Arc::clone(&store));
    info!(
        "Starting exporter on port '{}' with probing interval '{:?}'",
        config.port,
        probe.interval()
    );

    let handle = match probe.spawn() {
        Ok(handle) => handle,
        Err(e) => {
            error!("failed to start probe thread: {e}");
            std::process::exit(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };

    let served = rt.block_on(ssacli_exporter_server::run_server(
        store,
        &config.host,
        config.port,
        shutdown_signal(),
    ));

    if let Err(e) = served {
        error!("server on {}:{} failed: {e}", config.host, config.port);
        std::process::exit(1);
    }

    info!("shutting down");
    handle.stop(SHUTDOWN_GRACE);
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to listen for SIGTERM: {e}");
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
}
